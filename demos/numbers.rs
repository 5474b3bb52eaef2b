use clap::Parser;

#[derive(Parser, Debug)]
struct Args {
    /// Number of rows to generate
    #[clap(default_value = "1000")]
    rows: u64,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut writer = csv_scribe::WriterBuilder::new()
        .newline(csv_scribe::Newline::Lf)
        .from_writer(std::io::stdout().lock())?;

    writer.write_record(["index", "square", "inverse"])?;

    for index in 0..args.rows {
        writer.write_field(&index)?;
        writer.write_field(&(index * index))?;
        writer.write_field(&(1.0 / (index as f64 + 1.0)))?;
        writer.end_record()?;
    }

    writer.finish()?;

    Ok(())
}
