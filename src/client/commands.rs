// src/client/commands.rs

//! The I++ command catalogue. Each method formats one command and sends it;
//! arguments are passed through as the server expects them.
//!
//! `StartSession()` and `EndSession()` are on [`Client`] itself because they
//! also reset the tag pools.

use super::Client;
use crate::core::Result;
use crate::core::transaction::Transaction;
use std::sync::Arc;

type Sent = Result<Arc<Transaction>>;

impl Client {
    // --- Server ---

    /// Stops the daemon started by the command with the given event tag.
    pub async fn stop_daemon(&self, event_tag: &str) -> Sent {
        self.command(&format!("StopDaemon({event_tag})")).await
    }

    pub async fn stop_all_daemons(&self) -> Sent {
        self.command("StopAllDaemons()").await
    }

    /// Fast queue. Aborts everything queued on the normal queue.
    pub async fn abort_e(&self) -> Sent {
        self.command_e("AbortE()").await
    }

    /// Describes one error code, or the last error when `code` is `None`.
    pub async fn get_error_info(&self, code: Option<u16>) -> Sent {
        match code {
            Some(code) => self.command(&format!("GetErrorInfo({code})")).await,
            None => self.command("GetErrorInfo()").await,
        }
    }

    pub async fn clear_all_errors(&self) -> Sent {
        self.command("ClearAllErrors()").await
    }

    /// `GetProp(Tool.Name(), Tool.GoToPar.Speed())`, one entry per property.
    pub async fn get_prop(&self, props: &[&str]) -> Sent {
        self.command(&format!("GetProp({})", props.join(", "))).await
    }

    /// Fast queue variant of [`Client::get_prop`].
    pub async fn get_prop_e(&self, props: &[&str]) -> Sent {
        self.command_e(&format!("GetPropE({})", props.join(", "))).await
    }

    pub async fn set_prop(&self, assignments: &str) -> Sent {
        self.command(&format!("SetProp({assignments})")).await
    }

    /// Lists the properties of an object, e.g. `Tool.PtMeasPar()`.
    pub async fn enum_prop(&self, pointer: &str) -> Sent {
        self.command(&format!("EnumProp({pointer})")).await
    }

    /// Lists the whole property tree of an object.
    pub async fn enum_all_prop(&self, pointer: &str) -> Sent {
        self.command(&format!("EnumAllProp({pointer})")).await
    }

    pub async fn get_dme_version(&self) -> Sent {
        self.command("GetDMEVersion()").await
    }

    // --- DME ---

    pub async fn home(&self) -> Sent {
        self.command("Home()").await
    }

    /// Replies with `IsHomed(0)` or `IsHomed(1)`.
    pub async fn is_homed(&self) -> Sent {
        self.command("IsHomed()").await
    }

    pub async fn enable_user(&self) -> Sent {
        self.command("EnableUser()").await
    }

    pub async fn disable_user(&self) -> Sent {
        self.command("DisableUser()").await
    }

    pub async fn is_user_enabled(&self) -> Sent {
        self.command("IsUserEnabled()").await
    }

    /// Sets which values a `PtMeas` reply reports, e.g. `X(), Y(), Z(), IJK()`.
    pub async fn on_pt_meas_report(&self, format: &str) -> Sent {
        self.command(&format!("OnPtMeasReport({format})")).await
    }

    /// Fast queue. Starts a daemon reporting machine movement; its data lines
    /// keep arriving under the returned event tag until `StopDaemon`.
    pub async fn on_move_report_e(&self, format: &str) -> Sent {
        self.command_e(&format!("OnMoveReportE({format})")).await
    }

    pub async fn get_machine_class(&self) -> Sent {
        self.command("GetMachineClass()").await
    }

    /// Fast queue. Replies with `ErrStatus(1)` while the server is in error.
    pub async fn get_err_status_e(&self) -> Sent {
        self.command_e("GetErrStatusE()").await
    }

    /// One data line per status item, e.g. `IsHomed(1)` or
    /// `1009: Air Pressure Out Of Range`.
    pub async fn get_xtd_err_status(&self) -> Sent {
        self.command("GetXtdErrStatus()").await
    }

    /// Queries the current position, e.g. `X(), Y(), Z(), Tool.A()`.
    pub async fn get(&self, query: &str) -> Sent {
        self.command(&format!("Get({query})")).await
    }

    pub async fn go_to(&self, position: &str) -> Sent {
        self.command(&format!("GoTo({position})")).await
    }

    /// Single point measurement. Fails with error 1006 when no surface is
    /// found.
    pub async fn pt_meas(&self, target: &str) -> Sent {
        self.command(&format!("PtMeas({target})")).await
    }

    pub async fn tool(&self) -> Sent {
        self.command("Tool()").await
    }

    pub async fn find_tool(&self, name: &str) -> Sent {
        self.command(&format!("FindTool({name})")).await
    }

    pub async fn found_tool(&self) -> Sent {
        self.command("FoundTool()").await
    }

    pub async fn change_tool(&self, name: &str) -> Sent {
        self.command(&format!("ChangeTool(\"{name}\")")).await
    }

    /// Makes the server assume `name` is the active tool without moving.
    pub async fn set_tool(&self, name: &str) -> Sent {
        self.command(&format!("SetTool(\"{name}\")")).await
    }

    pub async fn align_tool(&self, args: &str) -> Sent {
        self.command(&format!("AlignTool({args})")).await
    }

    pub async fn go_to_par(&self) -> Sent {
        self.command("GoToPar()").await
    }

    pub async fn pt_meas_par(&self) -> Sent {
        self.command("PtMeasPar()").await
    }

    pub async fn enum_tools(&self) -> Sent {
        self.command("EnumTools()").await
    }

    pub async fn get_change_tool_action(&self, name: &str) -> Sent {
        self.command(&format!("GetChangeToolAction({name})")).await
    }

    pub async fn enum_tool_collection(&self, collection: &str) -> Sent {
        self.command(&format!("EnumToolCollection({collection})"))
            .await
    }

    pub async fn enum_all_tool_collections(&self, collection: &str) -> Sent {
        self.command(&format!("EnumAllToolCollections({collection})"))
            .await
    }

    /// Makes the tools of a collection reachable by bare name in `ChangeTool`.
    pub async fn open_tool_collection(&self, collection: &str) -> Sent {
        self.command(&format!("OpenToolCollection({collection})"))
            .await
    }

    pub async fn ijk_act(&self) -> Sent {
        self.command("IJKAct()").await
    }

    pub async fn pt_meas_self_center(&self, args: &str) -> Sent {
        self.command(&format!("PtMeasSelfCenter({args})")).await
    }

    pub async fn pt_meas_self_center_locked(&self, args: &str) -> Sent {
        self.command(&format!("PtMeasSelfCenterLocked({args})"))
            .await
    }

    pub async fn read_all_temperatures(&self) -> Sent {
        self.command("ReadAllTemperatures()").await
    }

    // --- CartCMM ---

    /// One of `MachineCsy`, `MoveableMachineCsy`, `MultipleArmCsy`,
    /// `RotaryTableVarCsy`, `PartCsy`.
    pub async fn set_coord_system(&self, csy: &str) -> Sent {
        self.command(&format!("SetCoordSystem({csy})")).await
    }

    pub async fn get_coord_system(&self) -> Sent {
        self.command("GetCoordSystem()").await
    }

    pub async fn get_csy_transformation(&self, csy: &str) -> Sent {
        self.command(&format!("GetCsyTransformation({csy})")).await
    }

    /// `PartCsy, x, y, z, theta, psi, phi`.
    pub async fn set_csy_transformation(&self, args: &str) -> Sent {
        self.command(&format!("SetCsyTransformation({args})")).await
    }

    pub async fn save_active_coord_system(&self, name: &str) -> Sent {
        self.command(&format!("SaveActiveCoordSystem({name})")).await
    }

    pub async fn load_coord_system(&self, name: &str) -> Sent {
        self.command(&format!("LoadCoordSystem({name})")).await
    }

    pub async fn delete_coord_system(&self, name: &str) -> Sent {
        self.command(&format!("DeleteCoordSystem({name})")).await
    }

    pub async fn enum_coord_system(&self) -> Sent {
        self.command("EnumCoordSystem()").await
    }

    pub async fn get_named_csy_transformation(&self, name: &str) -> Sent {
        self.command(&format!("GetNamedCsyTransformation({name})"))
            .await
    }

    pub async fn save_named_csy_transformation(&self, name: &str, coords: &str) -> Sent {
        self.command(&format!("SaveNamedCsyTransformation({name}, {coords})"))
            .await
    }

    // --- Tool ---

    pub async fn re_qualify(&self) -> Sent {
        self.command("ReQualify()").await
    }

    pub async fn scan_par(&self) -> Sent {
        self.command("ScanPar()").await
    }

    pub async fn avr_radius(&self) -> Sent {
        self.command("AvrRadius()").await
    }

    pub async fn is_alignable(&self) -> Sent {
        self.command("IsAlignable()").await
    }

    pub async fn alignment(&self, vectors: &str) -> Sent {
        self.command(&format!("Alignment({vectors})")).await
    }

    pub async fn calc_tool_alignment(&self, args: &str) -> Sent {
        self.command(&format!("CalcToolAlignment({args})")).await
    }

    pub async fn calc_tool_angles(&self, args: &str) -> Sent {
        self.command(&format!("CalcToolAngles({args})")).await
    }

    /// When enabled, a rotation of 180 degrees or more is rejected.
    pub async fn use_smallest_angle_to_align_tool(&self, enabled: bool) -> Sent {
        self.command(&format!(
            "UseSmallestAngleToAlignTool({})",
            u8::from(enabled)
        ))
        .await
    }

    // --- Scanning ---

    pub async fn on_scan_report(&self, format: &str) -> Sent {
        self.command(&format!("OnScanReport({format})")).await
    }

    pub async fn scan_on_circle_hint(&self, displacement: f64, form: f64) -> Sent {
        self.command(&format!("ScanOnCircleHint({displacement}, {form})"))
            .await
    }

    /// `Cx, Cy, Cz, Sx, Sy, Sz, i, j, k, delta, sfa, StepW`.
    pub async fn scan_on_circle(&self, args: &str) -> Sent {
        self.command(&format!("ScanOnCircle({args})")).await
    }

    pub async fn scan_on_line_hint(&self, angle: f64, form: f64) -> Sent {
        self.command(&format!("ScanOnLineHint({angle}, {form})"))
            .await
    }

    /// `Sx, Sy, Sz, Ex, Ey, Ez, i, j, k, StepW`.
    pub async fn scan_on_line(&self, args: &str) -> Sent {
        self.command(&format!("ScanOnLine({args})")).await
    }

    pub async fn scan_on_curve_hint(&self, deviation: f64, min_radius: f64) -> Sent {
        self.command(&format!("ScanOnCurveHint({deviation}, {min_radius})"))
            .await
    }

    pub async fn scan_on_curve_density(&self, args: &str) -> Sent {
        self.command(&format!("ScanOnCurveDensity({args})")).await
    }

    pub async fn scan_on_curve(&self, args: &str) -> Sent {
        self.command(&format!("ScanOnCurve({args})")).await
    }

    pub async fn scan_on_helix(&self, args: &str) -> Sent {
        self.command(&format!("ScanOnHelix({args})")).await
    }

    pub async fn scan_unknown_hint(&self, min_radius: f64) -> Sent {
        self.command(&format!("ScanUnknownHint({min_radius})")).await
    }

    pub async fn scan_unknown_density(&self, args: &str) -> Sent {
        self.command(&format!("ScanUnknownDensity({args})")).await
    }

    pub async fn scan_in_plane_end_is_sphere(&self, args: &str) -> Sent {
        self.command(&format!("ScanInPlaneEndIsSphere({args})"))
            .await
    }

    pub async fn scan_in_plane_end_is_plane(&self, args: &str) -> Sent {
        self.command(&format!("ScanInPlaneEndIsPlane({args})")).await
    }

    pub async fn scan_in_plane_end_is_cyl(&self, args: &str) -> Sent {
        self.command(&format!("ScanInPlaneEndIsCyl({args})")).await
    }

    pub async fn scan_in_cyl_end_is_sphere(&self, args: &str) -> Sent {
        self.command(&format!("ScanInCylEndIsSphere({args})")).await
    }

    pub async fn scan_in_cyl_end_is_plane(&self, args: &str) -> Sent {
        self.command(&format!("ScanInCylEndIsPlane({args})")).await
    }
}
