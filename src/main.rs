fn main() {
    if let Err(err) = exceedance_data::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
