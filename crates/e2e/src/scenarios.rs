//! Acceptance scenarios run by the `studio-e2e` binary

use crate::components::{Measure, TokenKind};
use crate::driver::Browser;
use crate::error::{E2eError, E2eResult};
use crate::pages::{TokensPage, WorkspacePage};
use crate::runner::{Group, Scenario, ScenarioContext, Suite};
use crate::shortcuts::{self, Command, Platform};
use crate::tenant::TeamSpec;

/// Team used by the file rename scenario
pub const RENAME_TEAM: &str = "alpha-autotest";

pub fn suite() -> Suite {
    Suite::new()
        .group(
            Group::new("dashboard").scenario(
                Scenario::new("create and rename file", create_and_rename_file)
                    .team(TeamSpec::Exact(RENAME_TEAM.to_string()))
                    .tag("dashboard"),
            ),
        )
        .group(
            Group::new("workspace").scenario(
                Scenario::new("fill color is persisted", fill_color_is_persisted)
                    .tag("workspace")
                    .tag("save-state"),
            ),
        )
        .group(
            Group::new("tokens").scenario(
                Scenario::new("apply radius token", apply_radius_token).tag("tokens"),
            ),
        )
        .group(
            Group::new("teams").scenario(
                Scenario::new(
                    "deleted team takes its files along",
                    deleted_team_takes_its_files_along,
                )
                .tag("teams"),
            ),
        )
        .group(
            Group::new("shortcuts").scenario(
                Scenario::new("copy shortcut per platform", copy_shortcut_per_platform)
                    .tag("shortcuts")
                    .offline(),
            ),
        )
}

/// Create a draft from the placeholder, open it and record it on the tenant
pub async fn open_new_file(ctx: &ScenarioContext) -> E2eResult<WorkspacePage> {
    let dashboard = ctx.dashboard()?;
    dashboard.open_drafts().await?;
    let name = dashboard.file_grid.create_file().await?;
    let workspace = dashboard.open_file(&name).await?;
    let url = workspace.session().current_url().await?;
    ctx.tenant()?.record_workspace(&name, &url);
    Ok(workspace)
}

pub async fn create_and_rename_file(ctx: ScenarioContext) -> E2eResult<()> {
    let dashboard = ctx.dashboard()?;
    dashboard.open_drafts().await?;
    let created = dashboard.file_grid.create_file().await?;
    dashboard.file_grid.rename_file(&created, "test").await?;
    dashboard.file_grid.expect_file_name("test").await
}

pub async fn fill_color_is_persisted(ctx: ScenarioContext) -> E2eResult<()> {
    let workspace = open_new_file(&ctx).await?;
    workspace
        .create_rectangle((100.0, 100.0), (300.0, 250.0))
        .await?;
    workspace.set_fill_hex("#FF0000").await?;
    workspace.save_sync().wait_for_saved().await?;
    workspace.design.fill().expect_hex("ff0000").await
}

pub async fn apply_radius_token(ctx: ScenarioContext) -> E2eResult<()> {
    let workspace = open_new_file(&ctx).await?;
    workspace
        .create_rectangle((100.0, 100.0), (300.0, 250.0))
        .await?;

    let page = TokensPage::new(workspace);
    page.open_panel().await?;
    page.create_token(TokenKind::BorderRadius, "global.radius", "-1")
        .await?;
    page.workspace.layers.select("Rectangle").await?;
    page.apply_token("global.radius").await?;
    page.tokens.expect_applied("global.radius").await?;
    page.workspace
        .design
        .expect_measure(Measure::Radius, "-1")
        .await
}

pub async fn deleted_team_takes_its_files_along(ctx: ScenarioContext) -> E2eResult<()> {
    let tenant = ctx.tenant()?.clone();
    for _ in 0..2 {
        let workspace = open_new_file(&ctx).await?;
        workspace.back_to_dashboard().await?;
    }
    let files = tenant.workspaces();
    if files.len() != 2 {
        return Err(E2eError::AssertionFailed {
            action: "record workspaces".into(),
            query: tenant.name().to_string(),
            expected: "2 workspaces".into(),
            actual: format!("{} workspaces", files.len()),
        });
    }

    ctx.tenants()?.delete_team(&tenant).await?;

    let workspace = WorkspacePage::new(ctx.session()?.clone());
    for file in files {
        workspace.session().goto(&file.url).await?;
        workspace.expect_unavailable().await?;
    }
    Ok(())
}

pub async fn copy_shortcut_per_platform(_ctx: ScenarioContext) -> E2eResult<()> {
    let engines = [Browser::Chromium, Browser::Firefox, Browser::Webkit];
    let cases = engines
        .iter()
        .map(|&b| (Platform::MacOs, b, "Meta+C"))
        .chain(engines.iter().map(|&b| (Platform::Linux, b, "Control+C")))
        .chain(engines.iter().map(|&b| (Platform::Windows, b, "Control+C")));

    for (platform, browser, expected) in cases {
        let actual = shortcuts::resolve(Command::Copy, platform, browser).to_string();
        if actual != expected {
            return Err(E2eError::AssertionFailed {
                action: "resolve copy shortcut".into(),
                query: format!("{}/{}", platform.as_str(), browser),
                expected: expected.to_string(),
                actual,
            });
        }
    }
    Ok(())
}
