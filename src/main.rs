use std::error::Error;
use std::io::Write;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use chord_node::join;
use chord_node::kv::file_store::random_files;
use chord_node::node::address::NodeAddr;
use chord_node::node::finger_table::FingerTable;
use chord_node::node::Node;
use chord_node::utils::cli::Cli;
use chord_node::utils::config::Config;
use chord_node::utils::crypto::{Key, KEYSPACE};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let config = Config::load(&cli.config_file)?;

    simple_logger::SimpleLogger::new()
        .env()
        .with_level(config.log_level_filter)
        .init()?;

    let addr = NodeAddr::new("localhost", config.port(cli.node_id)?)?;
    let node = match cli.helper_id {
        Some(helper_id) => {
            let helper = NodeAddr::new("localhost", config.port(helper_id)?)?;
            join::join(addr, helper).await?
        }
        None => join::bootstrap(addr, random_files(config.bootstrap_files)).await?,
    };

    run_shell(&node).await?;

    node.stop();
    Ok(())
}

async fn run_shell(node: &Node) -> Result<(), Box<dyn Error>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        println!();
        println!("1: Print Address");
        println!("2: Print Neighbors");
        println!("3: Print Contents");
        println!("4: Print Successors");
        println!("5: Print Finger Table");
        println!("6: Search Key");
        println!("7: Exit");
        prompt("\nEnter choice: ")?;

        let line = match lines.next_line().await? {
            Some(line) => line,
            None => return Ok(()),
        };
        match line.trim() {
            "1" => print_address(node),
            "2" => print_neighbors(node),
            "3" => print_contents(node),
            "4" => print_successors(node),
            "5" => print_finger_table(node),
            "6" => {
                if !search_key(node, &mut lines).await? {
                    return Ok(());
                }
            }
            "7" => return Ok(()),
            other => println!("Unknown choice {:?}", other),
        }
    }
}

fn prompt(text: &str) -> std::io::Result<()> {
    print!("{}", text);
    std::io::stdout().flush()
}

fn print_address(node: &Node) {
    println!();
    println!("Node Information:");
    println!("ID: {}", node.key());
    println!("Address: {}", node.addr());
}

fn print_neighbors(node: &Node) {
    let successor = node.successor();
    let predecessor = node.predecessor();
    println!();
    println!("Successor: {} (key {})", successor, successor.key());
    println!("Predecessor: {} (key {})", predecessor, predecessor.key());
}

fn print_contents(node: &Node) {
    println!();
    println!("{:<16}{}", "Filename", "Key");
    for (filename, key) in node.files_snapshot() {
        println!("{:<16}{}", filename, key);
    }
}

fn print_successors(node: &Node) {
    println!();
    println!("{:<8}{}", "S.No.", "Successor Key");
    for (i, successor) in node.successors_snapshot().iter().enumerate() {
        println!("{:<8}{}", i, successor.key());
    }
}

fn print_finger_table(node: &Node) {
    println!();
    println!("{:<8}{:<8}{:<28}{}", "Index", "Start", "Address", "Key");
    for (i, finger) in node.fingers_snapshot().iter().enumerate() {
        let start = FingerTable::start(node.key(), i);
        println!("{:<8}{:<8}{:<28}{}", i, start, finger.addr.to_string(), finger.key);
    }
}

async fn search_key(node: &Node, lines: &mut Lines<BufReader<Stdin>>) -> Result<bool, Box<dyn Error>> {
    prompt("Enter key to be searched: ")?;
    let line = match lines.next_line().await? {
        Some(line) => line,
        None => return Ok(false),
    };
    match line.trim().parse::<Key>() {
        Ok(id) if id < KEYSPACE => {
            let successor = node.find_successor(id).await;
            println!("Key {} is the responsibility of {} (key {})", id, successor, successor.key());
        }
        _ => println!("Expected a key in [0, {})", KEYSPACE),
    }
    Ok(true)
}
