fn main() {
    releasegraph::cli::run();
}
