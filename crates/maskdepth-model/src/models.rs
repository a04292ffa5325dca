pub mod blocks;
pub mod dual_head;
