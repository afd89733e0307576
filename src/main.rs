fn main() {
    if let Err(e) = carelink_lib::run() {
        tracing::error!("{e}");
        eprintln!("carelink: {e}");
        std::process::exit(1);
    }
}
