use std::time::{Duration, Instant};

use chrono::{Local, NaiveDateTime};
use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "synchrolog-probe")]
#[command(
    about = "Query the synchrolog diagnostic endpoint of a running service",
    long_about = None
)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the server's local time and its offset from this machine
    Time,
    /// Measure round-trip latency of the diagnostic endpoint
    Latency {
        #[arg(short, long, default_value_t = 10)]
        count: u32,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let endpoint = format!("{}/synchrolog-time", cli.url.trim_end_matches('/'));

    match cli.command {
        Commands::Time => {
            let body = fetch_time(&client, &endpoint).await?;
            let time = body["time"].as_str().ok_or("response has no `time` field")?;
            println!("server time: {time}");
            if let Ok(server) = NaiveDateTime::parse_from_str(time, "%Y-%m-%dT%H:%M:%S%.f") {
                let skew = server - Local::now().naive_local();
                println!("offset:      {} ms", skew.num_milliseconds());
            }
        }
        Commands::Latency { count } => {
            let mut samples = Vec::with_capacity(count as usize);
            for _ in 0..count {
                let start = Instant::now();
                fetch_time(&client, &endpoint).await?;
                samples.push(start.elapsed());
            }
            print_latency(&samples);
        }
    }

    Ok(())
}

async fn fetch_time(
    client: &reqwest::Client,
    endpoint: &str,
) -> Result<Value, Box<dyn std::error::Error>> {
    let res = client.get(endpoint).send().await?;
    let status = res.status();
    if !status.is_success() {
        return Err(format!("diagnostic endpoint returned status {status}").into());
    }
    Ok(res.json::<Value>().await?)
}

fn print_latency(samples: &[Duration]) {
    if samples.is_empty() {
        println!("no samples");
        return;
    }
    let mut sorted = samples.to_vec();
    sorted.sort();
    let total: Duration = sorted.iter().sum();
    let mean = total / sorted.len() as u32;
    println!("samples: {}", sorted.len());
    println!("min:     {:?}", sorted[0]);
    println!("mean:    {mean:?}");
    println!("p50:     {:?}", sorted[sorted.len() / 2]);
    println!("max:     {:?}", sorted[sorted.len() - 1]);
}
