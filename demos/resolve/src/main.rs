// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Resolve the credentials for a connection string and print their metadata.

use clap::Parser;
use gcputil_auth::resolver::Resolver;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const DESCRIPTION: &str = concat!(
    "Resolves the Google Cloud credentials for a connection string.",
    " The credentials come from the `credentials` query parameter, the",
    " GCPUTIL_GOOGLE_APPLICATION_CREDENTIALS environment variable, or the",
    " application default credentials, in that order."
);

const DEFAULT_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = DESCRIPTION)]
struct Args {
    /// The connection string, for example `bigquery://my-project/my-dataset`.
    #[arg(default_value = "")]
    connection_string: String,

    /// The OAuth 2.0 scopes requested for the access tokens.
    #[arg(long = "scope", default_value = DEFAULT_SCOPE)]
    scopes: Vec<String>,

    /// Bounds the time spent loading or discovering the credentials.
    #[arg(long, value_parser = parse_seconds)]
    timeout: Option<Duration>,

    /// Also mint an access token and print its expiration.
    #[arg(long, default_value_t = false)]
    token: bool,

    /// The log filter, in `tracing_subscriber::EnvFilter` syntax.
    #[arg(long, env = "RUST_LOG", default_value = "warn")]
    log: String,
}

fn parse_seconds(arg: &str) -> Result<Duration, String> {
    arg.parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|e| format!("expected a number of seconds: {e}"))
}

fn enable_tracing(args: &Args) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(&args.log)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    enable_tracing(&args)?;
    tracing::info!("configuration: {args:?}");

    let mut builder = Resolver::builder();
    if let Some(timeout) = args.timeout {
        builder = builder.with_timeout(timeout);
    }
    let resolver = builder.build();

    let (credentials, context) = resolver
        .resolve(&args.connection_string, args.scopes.iter().map(String::as_str))
        .await?;
    println!("type:           {}", context.cred_type);
    println!("project_id:     {}", context.project_id);
    println!("private_key_id: {}", context.private_key_id);
    println!("client_email:   {}", context.client_email);
    println!("client_id:      {}", context.client_id);

    if args.token {
        let token = credentials.token().await?;
        let expires_in = token
            .expires_at
            .map(|e| e.saturating_duration_since(tokio::time::Instant::now()));
        println!("token_type:     {}", token.token_type);
        println!("expires_in:     {expires_in:?}");
    }
    Ok(())
}
