/* Licensed to the Apache Software Foundation (ASF) under one
 * or more contributor license agreements.  See the NOTICE file
 * distributed with this work for additional information
 * regarding copyright ownership.  The ASF licenses this file
 * to you under the Apache License, Version 2.0 (the
 * "License"); you may not use this file except in compliance
 * with the License.  You may obtain a copy of the License at
 *
 *   http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing,
 * software distributed under the License is distributed on an
 * "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
 * KIND, either express or implied.  See the License for the
 * specific language governing permissions and limitations
 * under the License.
 */

use config::{Config, Environment, File};
use dotenvy::dotenv;
use figlet_rs::FIGfont;
use kafka_admin::configs::AdminConfig;
use kafka_admin::error::AdminRuntimeError;
use kafka_admin::{api, connect, kafka};
use mimalloc::MiMalloc;
use std::env;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), AdminRuntimeError> {
    if let Ok(standard_font) = FIGfont::standard() {
        if let Some(figure) = standard_font.convert("Kafka Admin") {
            eprintln!("{figure}");
        }
    }

    if let Ok(env_path) = env::var("KAFKA_ADMIN_ENV_PATH") {
        if dotenvy::from_path(&env_path).is_ok() {
            eprintln!("Loaded environment variables from path: {env_path}");
        }
    } else if let Ok(path) = dotenv() {
        eprintln!(
            "Loaded environment variables from .env file at path: {}",
            path.display()
        );
    }

    let config_path = env::var("KAFKA_ADMIN_CONFIG_PATH").unwrap_or_else(|_| "config".to_string());
    eprintln!("Loading configuration from: {config_path}");

    let config: AdminConfig = Config::builder()
        .add_source(File::with_name(&config_path))
        .add_source(
            Environment::with_prefix("KAFKA_ADMIN")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?
        .try_deserialize()?;

    Registry::default()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or(EnvFilter::new("INFO")))
        .init();

    info!("Starting Kafka Admin...");

    let connect = connect::init(&config.connect)?;
    let kafka = kafka::init(&config.kafka)?;

    let shutdown_signal = shutdown_signal()?;
    let (shutdown_sender, shutdown) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal.await;
        let _ = shutdown_sender.send(true);
    });

    api::start(&config.http, connect, kafka, shutdown).await?;

    info!("Kafka Admin stopped successfully");
    Ok(())
}

#[cfg(unix)]
fn shutdown_signal() -> Result<impl Future<Output = ()>, AdminRuntimeError> {
    use tokio::signal::unix::{SignalKind, signal};

    let install = |kind: SignalKind| {
        signal(kind).map_err(|error| {
            error!("Failed to install signal handler: {:?}", error);
            AdminRuntimeError::FailedToInstallSignalHandler
        })
    };
    let mut ctrl_c = install(SignalKind::interrupt())?;
    let mut sigterm = install(SignalKind::terminate())?;

    Ok(async move {
        tokio::select! {
            _ = ctrl_c.recv() => {
                info!("Received SIGINT. Shutting down Kafka Admin...");
            },
            _ = sigterm.recv() => {
                info!("Received SIGTERM. Shutting down Kafka Admin...");
            }
        }
    })
}

#[cfg(not(unix))]
fn shutdown_signal() -> Result<impl Future<Output = ()>, AdminRuntimeError> {
    Ok(async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {:?}", error);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl-C. Shutting down Kafka Admin...");
    })
}
