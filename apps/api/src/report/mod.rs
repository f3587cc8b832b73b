// Status report rendering
// Fixed-format markdown built from an annotated roll-up.

pub mod handlers;
pub mod markdown;
