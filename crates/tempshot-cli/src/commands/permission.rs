use clap::Subcommand;
use tempshot_core::PermissionGate;

use crate::capability::MarkerCapability;

#[derive(Subcommand)]
pub enum PermissionAction {
    /// Print whether prompts may be drawn
    Status,
    /// Ask for the overlay permission
    Request,
    /// Withdraw a previous grant
    Revoke,
}

fn status_line(granted: bool) -> &'static str {
    if granted {
        "granted"
    } else {
        "denied"
    }
}

pub fn run(action: PermissionAction) -> Result<(), Box<dyn std::error::Error>> {
    let gate = PermissionGate::new(MarkerCapability::from_data_dir()?);
    match action {
        PermissionAction::Status => {
            println!("{}", status_line(gate.has_permission()));
        }
        PermissionAction::Request => {
            gate.request_permission();
            // The consent flow reports nothing; read the grant back.
            println!("{}", status_line(gate.has_permission()));
        }
        PermissionAction::Revoke => {
            if gate.capability().revoke()? {
                println!("revoked");
            } else {
                println!("not granted");
            }
        }
    }
    Ok(())
}
