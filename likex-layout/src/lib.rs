pub mod grid;
pub mod order;

pub use grid::{
    Cell, OptionCell, QuestionRow, ScaleItem, ScalePlan, ScaleRow, Span, TablePlan, Track,
    VideoScalePlan, plan_scales, plan_table, plan_video_scale,
};
pub use order::{InOrder, OrderError, OrderSource, PresentationOrder, Shuffled};
