use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "modelrun", about = "Run an analytical technique over a tabular dataset", version)]
pub struct Cli {
    /// Technique identifier (e.g. kmeans, dbscan, ridge_regression).
    #[arg(value_name = "TECHNIQUE")]
    pub technique: Option<String>,

    /// Dataset file: CSV with a header row, or a JSON array of records.
    /// Pass `-` to read the dataset from standard input.
    #[arg(value_name = "DATA_FILE")]
    pub data_file: Option<String>,

    /// Technique parameters as key=value tokens.
    ///
    /// A value containing a `.` parses as a float, otherwise an integer
    /// parse is attempted, and on failure the value stays a plain string
    /// (so `eps=0.5` is a float, `min_samples=5` an integer, `method=ward`
    /// a string). Tokens without `=` are ignored.
    #[arg(value_name = "PARAMS")]
    pub params: Vec<String>,

    /// Pretty-print the output document (config: PRETTY_JSON).
    #[arg(long)]
    pub pretty: bool,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}
