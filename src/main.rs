use pyre::engine::uci::Uci;

fn main() {
    pyre::init();
    Uci::new().run();
}
