mod report;
mod styling;
mod tables;

pub use report::print_report;
pub use styling::{dim, magenta_bold};

/// Prints the `circle-builder` banner to stderr.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        magenta_bold("🔁 circle-builder"),
        dim(env!("CARGO_PKG_VERSION")),
        dim("Sequential CircleCI build runner")
    );
}
