use std::path::PathBuf;

use color_eyre::eyre::{self, WrapErr};
use henkan::{SubstitutionTable, Transcoder};
use log::info;

#[derive(clap::Args, Debug)]
/// Options for the `utf16le` command
pub struct Utf16leOpts {
    /// The UTF-16LE file to convert
    #[clap(short, long)]
    input: PathBuf,
    /// Where to write the result
    #[clap(short, long)]
    output: PathBuf,
    /// A CSV file with `from,to` rows of hexadecimal code points
    #[clap(short = 'g', long)]
    mapping: PathBuf,
}

fn convert(opt: &Utf16leOpts) -> eyre::Result<()> {
    let table = SubstitutionTable::load(&opt.mapping).wrap_err("Failed to load mapping")?;
    let transcoder = Transcoder::new(table);

    transcoder
        .transcode_file(&opt.input, &opt.output)
        .wrap_err_with(|| {
            format!(
                "Failed to convert `{}` to `{}`",
                opt.input.display(),
                opt.output.display()
            )
        })?;
    Ok(())
}

pub fn run(opt: Utf16leOpts) -> eyre::Result<()> {
    info!("START utf16le");
    let result = convert(&opt);
    if result.is_ok() {
        println!("Transformation complete.");
    }
    info!("END utf16le");
    result
}
