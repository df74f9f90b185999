use crate::backend::broker::Broker;
use crate::backend::model::BridgeModel;
use crate::workflow::runner::{Runner, TickResult};
use anyhow::{Context, Result};
use seaxcore::ais_interface::BoundsQuery;
use serde::Deserialize;
use serde_json::json;
use std::{
    future::Future,
    net::SocketAddr,
    sync::{Arc, RwLock},
};
use warp::{http::StatusCode, Filter};

pub const POSITIONS_DESTINATION: &str = "/topic/ais-data";

#[derive(Debug, Deserialize)]
struct PositionsParams {
    start: String,
    end: String,
}

#[derive(Debug, Deserialize)]
struct HealthToggle {
    up: bool,
}

/// Bridge that hosts the backend endpoints and pushes each tick to the broker.
#[derive(Clone)]
pub struct Bridge {
    state: Arc<RwLock<BridgeModel>>,
    broker: Broker,
    violations_destination: String,
}

impl Bridge {
    pub fn new(violations_destination: impl Into<String>) -> Self {
        Self {
            state: Arc::new(RwLock::new(BridgeModel::default())),
            broker: Broker::new(),
            violations_destination: violations_destination.into(),
        }
    }

    pub fn routes(&self) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
        let state_for_filter = self.state.clone();
        let state_filter = warp::any().map(move || state_for_filter.clone());
        let broker_for_filter = self.broker.clone();
        let broker_filter = warp::any().map(move || broker_for_filter.clone());

        let health_route = warp::path!("actuator" / "health")
            .and(warp::get())
            .and(state_filter.clone())
            .map(|state: Arc<RwLock<BridgeModel>>| {
                let healthy = state.read().map(|model| model.healthy).unwrap_or(false);
                if healthy {
                    warp::reply::with_status(warp::reply::json(&json!({"status": "UP"})), StatusCode::OK)
                } else {
                    warp::reply::with_status(
                        warp::reply::json(&json!({"status": "DOWN"})),
                        StatusCode::SERVICE_UNAVAILABLE,
                    )
                }
            });

        let positions_route = warp::path!("api" / "vessels" / "positions")
            .and(warp::get())
            .and(warp::query::<PositionsParams>())
            .and(state_filter.clone())
            .map(|params: PositionsParams, state: Arc<RwLock<BridgeModel>>| {
                let query = match BoundsQuery::from_params(&params.start, &params.end) {
                    Ok(query) => query,
                    Err(err) => {
                        return warp::reply::with_status(
                            warp::reply::json(&json!({"error": err.to_string()})),
                            StatusCode::BAD_REQUEST,
                        )
                    }
                };
                match state.read() {
                    Ok(model) if model.healthy => warp::reply::with_status(
                        warp::reply::json(&model.within(&query)),
                        StatusCode::OK,
                    ),
                    _ => warp::reply::with_status(
                        warp::reply::json(&json!({"error": "backend unavailable"})),
                        StatusCode::SERVICE_UNAVAILABLE,
                    ),
                }
            });

        let control_route = warp::path!("control" / "health")
            .and(warp::post())
            .and(warp::body::json())
            .and(state_filter)
            .and(broker_filter.clone())
            .map(|toggle: HealthToggle, state: Arc<RwLock<BridgeModel>>, broker: Broker| {
                if let Ok(mut model) = state.write() {
                    model.healthy = toggle.up;
                }
                broker.set_accepting(toggle.up);
                println!("[SIM] Backend health set to {}", if toggle.up { "UP" } else { "DOWN" });
                warp::reply::with_status(
                    warp::reply::json(&json!({"status": "ok", "up": toggle.up})),
                    StatusCode::OK,
                )
            });

        let ws_route = warp::path("ws")
            .and(warp::ws())
            .and(broker_filter)
            .map(|ws: warp::ws::Ws, broker: Broker| ws.on_upgrade(move |socket| broker.serve_socket(socket)));

        health_route.or(positions_route).or(control_route).or(ws_route)
    }

    /// Binds `addr` and returns the bound address with the server future.
    pub fn bind(&self, addr: SocketAddr) -> Result<(SocketAddr, impl Future<Output = ()>)> {
        warp::serve(self.routes())
            .try_bind_ephemeral(addr)
            .with_context(|| format!("binding backend bridge on {}", addr))
    }

    /// Refreshes the served fleet picture and fans the tick out to subscribers.
    pub fn publish(&self, runner: &Runner, tick: &TickResult) -> Result<()> {
        if let Ok(mut guard) = self.state.write() {
            guard.vessels = runner.vessels().to_vec();
            guard.ticks = runner.ticks();
            guard.clock_ms = runner.clock_ms();
        }

        for record in &tick.positions {
            self.broker.publish(POSITIONS_DESTINATION, record)?;
        }
        for event in &tick.violations {
            self.broker.publish(&self.violations_destination, event)?;
            println!("[SIM] {} -> {}", event.vid, event.summary());
        }
        Ok(())
    }

    pub fn publish_status(&self, message: &str) {
        println!("[SIM] {}", message);
    }

    #[cfg(test)]
    pub fn snapshot(&self) -> BridgeModel {
        self.state.read().unwrap().clone()
    }
}
