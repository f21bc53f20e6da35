pub mod claude;
pub mod util;

pub use claude::Claude;
pub use util::{extract_json, strip_code_blocks, truncate_to_char_boundary};
