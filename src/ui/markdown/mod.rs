mod code;
mod parser;
mod rich;

pub use parser::{markdown_options, segment, Block, BlockKind};
pub use rich::{
    plain_text, rich_nodes, text_len, tree_lines, tree_lines_fading, ElementKind, RichNode,
    VoidKind,
};
