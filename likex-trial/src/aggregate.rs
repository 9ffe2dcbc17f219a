//! Snapshot aggregation of radio-group state into the response map.
//!
//! Aggregation runs exactly once, at finalize time, over whatever is selected
//! at that instant; nothing is maintained incrementally, so it is safe to
//! invoke at any point after render.

use std::collections::{BTreeMap, HashMap};

use likex_core::ResponseValue;

/// Group id of the single scale in the video variant.
pub const VIDEO_GROUP: &str = "response";

/// Stable group identifier for a question, derived from its original index
/// so it survives any display-order shuffle.
pub fn group_id(original_index: usize) -> String {
    format!("Q{original_index}")
}

/// Runtime binding of one rendered question to its radio group and the name
/// its response is reported under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseGroup {
    pub group_id: String,
    /// Reporting key: the declared question name, or the group id when the
    /// declaration is empty. Two differently-ordered runs of one config thus
    /// always produce comparable response maps.
    pub name: String,
    pub original_index: usize,
}

impl ResponseGroup {
    pub fn for_question(original_index: usize, declared_name: &str) -> Self {
        let group_id = group_id(original_index);
        let name = if declared_name.is_empty() {
            group_id.clone()
        } else {
            declared_name.to_string()
        };
        Self {
            group_id,
            name,
            original_index,
        }
    }

    pub fn for_video(declared_name: &str) -> Self {
        let name = if declared_name.is_empty() {
            VIDEO_GROUP.to_string()
        } else {
            declared_name.to_string()
        };
        Self {
            group_id: VIDEO_GROUP.to_string(),
            name,
            original_index: 0,
        }
    }
}

/// Read-only view of the current selection state, one value per group at
/// most (native radio exclusivity).
pub trait SelectionSnapshot {
    fn selected(&self, group_id: &str) -> Option<u32>;
}

impl SelectionSnapshot for HashMap<String, u32> {
    fn selected(&self, group_id: &str) -> Option<u32> {
        self.get(group_id).copied()
    }
}

/// Reduces the rendered groups against a live selection snapshot. Every
/// group contributes exactly one entry; unanswered groups map to the empty
/// string, never to an omitted key.
pub fn collect_responses(
    groups: &[ResponseGroup],
    snapshot: &dyn SelectionSnapshot,
) -> BTreeMap<String, ResponseValue> {
    groups
        .iter()
        .map(|group| {
            let value = snapshot
                .selected(&group.group_id)
                .map_or(ResponseValue::Unanswered, ResponseValue::Selected);
            (group.name.clone(), value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_name_falls_back_to_group_id() {
        let anon = ResponseGroup::for_question(4, "");
        assert_eq!(anon.group_id, "Q4");
        assert_eq!(anon.name, "Q4");

        let named = ResponseGroup::for_question(4, "mood");
        assert_eq!(named.group_id, "Q4");
        assert_eq!(named.name, "mood");
    }

    #[test]
    fn unanswered_groups_still_get_an_entry() {
        let groups = vec![
            ResponseGroup::for_question(0, ""),
            ResponseGroup::for_question(1, "mood"),
            ResponseGroup::for_question(2, ""),
        ];
        let mut selections = HashMap::new();
        selections.insert("Q1".to_string(), 3);

        let map = collect_responses(&groups, &selections);
        assert_eq!(map.len(), 3);
        assert_eq!(map["Q0"], ResponseValue::Unanswered);
        assert_eq!(map["mood"], ResponseValue::Selected(3));
        assert_eq!(map["Q2"], ResponseValue::Unanswered);
    }

    #[test]
    fn snapshot_reads_the_freshest_value() {
        let groups = vec![ResponseGroup::for_question(0, "")];
        let mut selections = HashMap::new();
        selections.insert("Q0".to_string(), 1);
        selections.insert("Q0".to_string(), 2);
        let map = collect_responses(&groups, &selections);
        assert_eq!(map["Q0"], ResponseValue::Selected(2));
    }
}
