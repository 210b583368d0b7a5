pub mod magics;
pub mod movegen;
pub mod tables;

pub use magics::{bishop_attacks, queen_attacks, rook_attacks};
pub use tables::{path_board, ray_board, KING_ATTACKS, KNIGHT_ATTACKS, PAWN_ATTACKS};

pub fn init() {
    magics::init();
    std::sync::LazyLock::force(&tables::LINE_TABLES);
    std::sync::LazyLock::force(&tables::KNIGHT_ATTACKS);
    std::sync::LazyLock::force(&tables::KING_ATTACKS);
    std::sync::LazyLock::force(&tables::PAWN_ATTACKS);
}
