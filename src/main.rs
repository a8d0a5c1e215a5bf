fn main() {
    if let Err(err) = csv_transpose::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
