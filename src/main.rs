fn main() {
    mysterious_forest::game::run();
}
