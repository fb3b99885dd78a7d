use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Identifier of this node in the deployment port table
    pub node_id: u32,

    /// Identifier of a node already in the ring to join through;
    /// omit it to start a new ring
    pub helper_id: Option<u32>,

    #[arg(short = 'c', long = "config", default_value = "ports.ini")]
    pub config_file: String,
}
