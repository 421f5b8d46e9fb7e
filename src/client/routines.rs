// src/client/routines.rs

//! Common multi-command sequences built on the command catalogue.

use super::Client;
use crate::core::geometry::{Csy, Float3};
use crate::core::transaction::Transaction;
use crate::core::{IppError, Result};
use tracing::{debug, info};

const HOMED: &str = "IsHomed(1)";
const NOT_HOMED: &str = "IsHomed(0)";

/// Homes the machine unless it reports that it already is. Returns true if
/// a `Home()` was issued.
pub async fn ensure_homed(client: &Client) -> Result<bool> {
    let reply = client.is_homed().await?.on_complete().await?;
    let payloads = reply.data_payloads();
    debug!("IsHomed replied {:?}", payloads);

    if payloads.iter().any(|p| p.contains(HOMED)) {
        return Ok(false);
    }
    if !payloads.iter().any(|p| p.contains(NOT_HOMED)) {
        return Err(unexpected(&reply));
    }

    info!("Machine is not homed; homing.");
    client.home().await?.on_complete().await?;
    Ok(true)
}

/// Changes to `name` unless it is already the active tool. Returns true if
/// a `ChangeTool` was issued.
pub async fn ensure_tool_loaded(client: &Client, name: &str) -> Result<bool> {
    let reply = client.get_prop(&["Tool.Name()"]).await?.on_complete().await?;
    let loaded = reply
        .data_payloads()
        .first()
        .is_some_and(|p| p.contains(name));
    if loaded {
        return Ok(false);
    }

    info!("Changing tool to {}.", name);
    client.change_tool(name).await?.on_complete().await?;
    Ok(true)
}

/// Installs `csy` as the part coordinate system and makes it active.
pub async fn set_part_csy(client: &Client, csy: &Csy) -> Result<()> {
    client
        .set_csy_transformation(&format!("PartCsy, {}", csy.to_arg_string()))
        .await?
        .on_complete()
        .await?;
    client.set_coord_system("PartCsy").await?.on_complete().await?;
    Ok(())
}

/// The current tool position in the active coordinate system.
pub async fn current_position(client: &Client) -> Result<Float3> {
    let reply = client.get("X(), Y(), Z()").await?.on_complete().await?;
    Float3::from_xyz_str(&first_data(&reply)?)
}

/// Measures `target` approaching along `normal` and returns the measured point.
pub async fn measure_point(client: &Client, target: Float3, normal: Float3) -> Result<Float3> {
    let args = format!("{}, {}", target.to_xyz_string(), normal.to_ijk_string());
    let reply = client.pt_meas(&args).await?.on_complete().await?;
    Float3::from_xyz_str(&first_data(&reply)?)
}

fn first_data(reply: &Transaction) -> Result<String> {
    reply
        .data_payloads()
        .into_iter()
        .next()
        .ok_or_else(|| unexpected(reply))
}

fn unexpected(reply: &Transaction) -> IppError {
    IppError::UnexpectedReply(format!(
        "{} {} returned {:?}",
        reply.tag(),
        reply.command(),
        reply.data_lines()
    ))
}
