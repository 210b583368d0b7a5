pub mod chess;
pub mod engine;

/// Forces the lazily-built attack and hashing tables. The tables build
/// themselves on first use either way; calling this at startup keeps the
/// first search free of initialization cost.
pub fn init() {
    chess::attacks::init();
    chess::zobrist::init();
}
