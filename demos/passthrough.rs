use std::fs::File;

use clap::Parser;

#[derive(Parser, Debug)]
struct Args {
    /// Path to target CSV file
    path: String,
}

impl Args {
    fn delimiter(&self) -> u8 {
        if self.path.ends_with(".tsv") {
            b'\t'
        } else {
            b','
        }
    }
}

const DEFAULT_CAPACITY: usize = 64 * (1 << 10);

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let delimiter = args.delimiter();
    let file = File::open(&args.path)?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(file);

    let mut writer = csv_scribe::WriterBuilder::new()
        .delimiter(delimiter)
        .newline(csv_scribe::Newline::Lf)
        .buffer_capacity(DEFAULT_CAPACITY)
        .from_writer(std::io::stdout().lock())?;

    let mut record = csv::ByteRecord::new();

    while reader.read_byte_record(&mut record)? {
        writer.write_record(&record)?;
    }

    writer.finish()?;

    Ok(())
}
