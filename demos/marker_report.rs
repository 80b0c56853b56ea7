use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    heritage_markers::example_apps::run_marker_report()
}
