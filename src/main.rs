fn main() -> eframe::Result {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
    dovetail::run_gui()
}
