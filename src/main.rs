fn main() {
    if let Err(err) = restaurant_dashboard::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
