use coordinate_spaces::logging::init_logging;
use coordinate_spaces::{AppConfig, run};

fn main() {
    init_logging();

    if let Err(e) = run(AppConfig::default()) {
        log::error!("{e}");
        std::process::exit(-1);
    }
}
