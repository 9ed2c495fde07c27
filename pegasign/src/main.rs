//! Command-line front end for producing `.pega` signed firmware containers.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use log::debug;
use pegaimage::signer;

/// Packages a raw firmware image into a signed `.pega` container.
///
/// The output is written next to the source image as `<IMAGE>.pega`.
#[derive(Parser)]
#[command(name = "pegasign", version, about)]
struct Cli {
    /// Path to the raw firmware image to package.
    image: PathBuf,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let output = signer::output_path_for(&cli.image);
    debug!("signing {} -> {}", cli.image.display(), output.display());

    signer::sign_file(&cli.image, &output)
        .with_context(|| format!("failed to sign {}", cli.image.display()))?;

    println!("{} {}", "signed:".green().bold(), output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_exactly_one_argument() {
        assert!(Cli::try_parse_from(["pegasign"]).is_err());
        assert!(Cli::try_parse_from(["pegasign", "a.bin", "b.bin"]).is_err());
    }

    #[test]
    fn test_accepts_single_image_path() {
        let cli = Cli::try_parse_from(["pegasign", "firmware.img"])
            .expect("single positional argument must parse");
        assert_eq!(cli.image, PathBuf::from("firmware.img"));
    }
}
