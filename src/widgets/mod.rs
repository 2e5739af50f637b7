pub mod columns;
pub mod controls;
pub mod datatable;
pub mod debug;
pub mod export;
pub mod intake;
pub mod multiline_text_input;
pub mod radio_block;
pub mod schema;
pub mod sql_editor;
pub mod text_input;
pub mod text_input_common;
