fn main() {
    if let Err(err) = visutest_lib::run() {
        log::error!("VisuTest stopped: {err:#}");
        std::process::exit(1);
    }
}
