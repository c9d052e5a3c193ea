//! Server configuration from the command line and environment.

use clap::Parser;
use std::net::{IpAddr, SocketAddr};

use crate::error::Result;
use crate::store::{EvaluationConfig, DEFAULT_BRUTE_FORCE_MAX_POINTS};
use crate::tsp::{AnnealingConfig, DEFAULT_COOLING_RATE, DEFAULT_INITIAL_TEMPERATURE, DEFAULT_STEPS};

#[derive(Parser, Debug, Clone)]
#[command(name = "network-tsp")]
#[command(about = "Snap points onto a road network and compare TSP solvers over it")]
#[command(version)]
pub struct ServerConfig {
    /// Address to bind
    #[arg(long, env = "NETWORK_TSP_HOST", default_value = "127.0.0.1")]
    pub host: IpAddr,

    /// Port to listen on
    #[arg(short, long, env = "NETWORK_TSP_PORT", default_value_t = 8000)]
    pub port: u16,

    /// Origins allowed by CORS
    #[arg(
        long = "allowed-origin",
        env = "NETWORK_TSP_ALLOWED_ORIGINS",
        value_delimiter = ',',
        default_values_t = [
            "http://localhost:5173".to_string(),
            "http://127.0.0.1:5173".to_string(),
        ]
    )]
    pub allowed_origins: Vec<String>,

    /// Skip brute force when there are more points than this
    #[arg(long, env = "NETWORK_TSP_BRUTE_FORCE_MAX_POINTS", default_value_t = DEFAULT_BRUTE_FORCE_MAX_POINTS)]
    pub brute_force_max_points: usize,

    /// Starting temperature for simulated annealing
    #[arg(long, env = "NETWORK_TSP_SA_TEMPERATURE", default_value_t = DEFAULT_INITIAL_TEMPERATURE)]
    pub sa_temperature: f64,

    /// Cooling factor applied after every annealing step
    #[arg(long, env = "NETWORK_TSP_SA_COOLING", default_value_t = DEFAULT_COOLING_RATE)]
    pub sa_cooling: f64,

    /// Annealing step budget
    #[arg(long, env = "NETWORK_TSP_SA_STEPS", default_value_t = DEFAULT_STEPS)]
    pub sa_steps: u64,

    /// Fixed annealing seed for reproducible runs
    #[arg(long, env = "NETWORK_TSP_SA_SEED")]
    pub sa_seed: Option<u64>,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Rejects solver settings that cannot work, before the server starts.
    pub fn validate(&self) -> Result<()> {
        self.evaluation().annealing.validate()
    }

    pub fn evaluation(&self) -> EvaluationConfig {
        EvaluationConfig {
            annealing: AnnealingConfig {
                initial_temperature: self.sa_temperature,
                cooling_rate: self.sa_cooling,
                steps: self.sa_steps,
                seed: self.sa_seed,
            },
            brute_force_max_points: self.brute_force_max_points,
        }
    }
}
