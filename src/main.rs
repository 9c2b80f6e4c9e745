use ipvl::ui::output;

fn main() {
    if let Err(e) = ipvl::cli::run() {
        output::error(format!("{:#}", e));
        std::process::exit(1);
    }
}
