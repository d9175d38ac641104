fn main() {
    if let Err(err) = taskpad_core::run(std::env::args_os().collect()) {
        eprintln!("taskpad: {err:#}");
        std::process::exit(1);
    }
}
