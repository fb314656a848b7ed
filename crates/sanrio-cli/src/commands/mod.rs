// One module per subcommand. Handlers print their own output and return
// `anyhow::Result` so that `main` can report failures uniformly.

pub mod ensure_index;
pub mod ping;
pub mod port_check;
