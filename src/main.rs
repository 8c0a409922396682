fn main() {
    if let Err(err) = sales_digest::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
