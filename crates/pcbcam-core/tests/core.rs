#[path = "core/codec.rs"]
mod codec;
#[path = "core/depth.rs"]
mod depth;
#[path = "core/tool_table.rs"]
mod tool_table;
