//! # Example: screencast
//!
//! Plays the two-window scenario with a key-display task kept alive by the
//! supervisor.
//!
//! Shows how to:
//! - Register a [`ManagedTaskKind`] with a handover callback.
//! - Drive the supervisor from a host loop ([`SimHost`]).
//! - Watch decisions through the built-in [`LogWriter`].
//!
//! ## Flow
//! ```text
//! tick 1: user starts the task on W1
//! tick 2: W2 becomes active            ─► auto-start on W2
//! tick 3: a foreign tool buries W1     ─► restart on W1, same anchor
//! tick 4: W2 closes                    ─► purge
//! render session: pre-tick replaced by one timer per window
//! Escape on W1                         ─► exit everywhere, exit timers
//! terminate
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=debug cargo run --example screencast --features logging
//! ```

use std::sync::{Arc, Mutex};
use std::time::Duration;

use modalvisor::host::sim::SimHost;
use modalvisor::host::{Anchor, AreaId, RegionId};
use modalvisor::{
    HostEvent, HostEventKind, LogWriter, ManagedTaskKind, ModalFn, Outcome, Subscribe, Supervisor,
    SupervisorConfig, TaskContext,
};
use tracing_subscriber::EnvFilter;

const TASK: &str = "VIEW3D_OT_screencast_keys";
const ESC: u32 = 27;

/// Key-display task: remembers the last few keys it saw, finishes on Escape.
fn screencast_keys(shown: Arc<Mutex<Vec<u32>>>) -> ManagedTaskKind {
    ManagedTaskKind::new(TASK, move || {
        let shown = Arc::clone(&shown);
        ModalFn::new(move |ctx: &TaskContext, event: &HostEvent| match event.kind {
            HostEventKind::Key { code: ESC, pressed: true } => Outcome::finished(),
            HostEventKind::Key { code, pressed: true } => {
                let mut keys = shown.lock().unwrap_or_else(|e| e.into_inner());
                keys.push(code);
                println!("[{}] key {code} (area {:?})", ctx.window, ctx.anchor.area);
                Outcome::running_pass_through()
            }
            _ => Outcome::running_pass_through(),
        })
    })
    .with_callback(|h| {
        println!(
            "[handover] {} on {} (previous: {:?})",
            h.instance, h.ctx.window, h.previous
        );
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init();

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let mut sup = Supervisor::builder(SupervisorConfig::default())
        .with_subscribers(subs)
        .build()?;

    let shown = Arc::new(Mutex::new(Vec::new()));
    sup.register(screencast_keys(Arc::clone(&shown)))?;

    let mut host = SimHost::new();
    let w1 = host.open_window();
    let viewport = Anchor::new(AreaId(1), RegionId(5));
    let none = HostEvent::none();

    // tick 1
    let ctx = TaskContext::new(w1).with_anchor(viewport);
    sup.invoke(&mut host, TASK, &ctx, &none)?;

    // tick 2
    let w2 = host.open_window();
    host.set_active(w2);
    host.frame(&mut sup, w2, &none);

    // tick 3
    host.push_foreign(w1, "MESH_OT_knife_tool");
    host.frame(&mut sup, w1, &none);
    println!("anchor on {w1}: {:?}", sup.anchor(TASK, w1));
    host.dismiss_foreign(w1);
    host.deliver(&mut sup, w1, &HostEvent::key(65, true));

    // tick 4
    host.close_window(w2);
    host.frame(&mut sup, w1, &none);
    println!("running on: {:?}", sup.windows(TASK));

    // render session
    host.render_init(&mut sup);
    host.push_ui(w1);
    host.fire_timers_on(&mut sup, w1);
    host.render_complete(&mut sup);
    host.dismiss_foreign(w1);

    // Escape
    host.deliver(&mut sup, w1, &HostEvent::key(ESC, true));
    host.fire_timers_on(&mut sup, w1);
    println!(
        "running anywhere: {}, keys shown: {:?}",
        sup.is_running(&host, TASK, None),
        shown.lock().unwrap_or_else(|e| e.into_inner())
    );

    sup.terminate(&mut host);
    println!("timers: {}, hooks: {}", host.timer_count(), host.hook_count());

    // let the log writer drain
    tokio::time::sleep(Duration::from_millis(50)).await;
    Ok(())
}
