use anyhow::{anyhow, bail, Context, Result};
use chrono::SecondsFormat;
use clap::{Parser, Subcommand};
use project::{ClientConfig, HttpTimelineApi, NleSession, TimelineApi};
use serde_json::{json, Value};
use timeline::{Clip, SplitIds};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "nle-cli", about = "Inspect and edit studio timeline projects")]
struct Cli {
    /// Backend base URL (overrides config file and NLE_API_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,
    #[arg(long, global = true)]
    tenant: Option<String>,
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a run's artifact manifest
    Manifest { run_id: String },
    /// Open (auto-assembling if needed) the project for a run
    LoadRun { run_id: String },
    Show { project_id: String },
    /// Rebuild a project from its run, discarding edits
    Reassemble { project_id: String },
    Trim { project_id: String, clip_id: String, start: f64, end: f64 },
    Split { project_id: String, clip_id: String, at: f64 },
    Move { project_id: String, clip_id: String, start: f64 },
    /// Rebind a clip to another candidate from the run manifest
    ReplaceAsset { project_id: String, clip_id: String, asset_id: String },
    Regenerate {
        project_id: String,
        shot_id: String,
        #[arg(long, default_value = "")]
        prompt: String,
        #[arg(long, default_value = "standard")]
        quality: String,
        #[arg(long)]
        duration: Option<f64>,
    },
}

impl Cli {
    fn config(&self) -> Result<ClientConfig> {
        let mut cfg = ClientConfig::load()?;
        if let Some(v) = &self.base_url { cfg.base_url = v.clone(); }
        if let Some(v) = &self.tenant { cfg.tenant_id = v.clone(); }
        if let Some(v) = self.timeout_ms { cfg.timeout_ms = v; }
        Ok(cfg)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();

    let cli = Cli::parse();
    let cfg = cli.config()?;
    tracing::debug!(base_url = %cfg.base_url, tenant = %cfg.tenant_id, "client config");
    let api = HttpTimelineApi::new(cfg.clone())?;

    let out = match cli.command {
        Command::Manifest { run_id } => serde_json::to_value(api.artifacts_manifest(&run_id).await?)?,
        Command::LoadRun { run_id } => {
            let mut session = NleSession::new(api, &cfg);
            session.load_run(&run_id).await?;
            summary(&session)
        }
        Command::Show { project_id } => summary(&open(api, &cfg, &project_id).await?),
        Command::Reassemble { project_id } => {
            let mut session = open(api, &cfg, &project_id).await?;
            session.reassemble().await?;
            summary(&session)
        }
        Command::Trim { project_id, clip_id, start, end } => {
            let mut session = open(api, &cfg, &project_id).await?;
            require(session.trim_clip(&clip_id, start, end)?, &clip_id)?;
            save(&mut session).await?;
            clip_json(&session, &clip_id)?
        }
        Command::Split { project_id, clip_id, at } => {
            let mut session = open(api, &cfg, &project_id).await?;
            let Some(SplitIds { left, right }) = session.split_clip(&clip_id, at)? else {
                bail!("clip {clip_id} not found or {at} is not inside it");
            };
            save(&mut session).await?;
            json!({ "left": clip_json(&session, &left)?, "right": clip_json(&session, &right)? })
        }
        Command::Move { project_id, clip_id, start } => {
            let mut session = open(api, &cfg, &project_id).await?;
            require(session.move_clip(&clip_id, start)?, &clip_id)?;
            save(&mut session).await?;
            clip_json(&session, &clip_id)?
        }
        Command::ReplaceAsset { project_id, clip_id, asset_id } => {
            let mut session = open(api, &cfg, &project_id).await?;
            session.load_manifest().await?;
            let candidate = session
                .candidates_for(&clip_id)
                .into_iter()
                .find(|c| c.asset_id == asset_id)
                .cloned()
                .ok_or_else(|| anyhow!("asset {asset_id} is not a candidate for clip {clip_id}"))?;
            require(session.replace_candidate_asset(&clip_id, &candidate)?, &clip_id)?;
            save(&mut session).await?;
            clip_json(&session, &clip_id)?
        }
        Command::Regenerate { project_id, shot_id, prompt, quality, duration } => {
            let mut session = open(api, &cfg, &project_id).await?;
            serde_json::to_value(session.regenerate_shot(&shot_id, &prompt, &quality, duration).await?)?
        }
    };

    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

async fn open(api: HttpTimelineApi, cfg: &ClientConfig, project_id: &str) -> Result<NleSession<HttpTimelineApi>> {
    let mut session = NleSession::new(api, cfg);
    session.load_project(project_id).await.with_context(|| format!("load project {project_id}"))?;
    Ok(session)
}

async fn save(session: &mut NleSession<HttpTimelineApi>) -> Result<()> {
    session.save_project().await.context("save project")?;
    Ok(())
}

fn require(applied: bool, clip_id: &str) -> Result<()> {
    if !applied { bail!("no clip {clip_id} in project"); }
    Ok(())
}

fn clip_json<A: TimelineApi>(session: &NleSession<A>, clip_id: &str) -> Result<Value> {
    let clip = session.timeline().clip(clip_id).ok_or_else(|| anyhow!("no clip {clip_id} in project"))?;
    Ok(serde_json::to_value(clip)?)
}

fn summary<A: TimelineApi>(session: &NleSession<A>) -> Value {
    let tl = session.timeline();
    let tracks: Vec<Value> = session
        .sorted_tracks()
        .into_iter()
        .map(|t| {
            let mut clips: Vec<&Clip> = session.clips_for_track(&t.track_id).collect();
            clips.sort_by(|a, b| a.start.total_cmp(&b.start));
            let clips: Vec<Value> = clips
                .into_iter()
                .map(|c| json!({ "clip_id": c.clip_id, "asset_id": c.asset_id, "start": c.start, "end": c.end }))
                .collect();
            json!({ "track_id": t.track_id, "type": t.kind, "name": t.name, "order": t.order, "clips": clips })
        })
        .collect();
    json!({
        "project_id": session.project_id(),
        "run_id": tl.run_id,
        "fps": tl.fps,
        "resolution": tl.resolution,
        "total_duration_sec": tl.total_duration_sec,
        "synced_at": session.last_synced_at().map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true)),
        "tracks": tracks,
    })
}
