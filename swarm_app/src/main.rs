//! Headless swarm demo
//!
//! Exercises the full pipeline without a GPU: worker threads create
//! entities and transforms and request shared resources, then the main
//! thread plays the part of the render thread, draining device tasks
//! and submitting instanced draw calls against the headless backend.

use std::sync::Arc;

use lattice_engine::prelude::*;

const WORKERS: usize = 4;
const ENTITIES_PER_WORKER: usize = 75;
const FRAMES: usize = 3;

fn main() -> Result<(), EngineError> {
    lattice_engine::foundation::logging::init();

    log::info!("creating headless device...");
    let device = HeadlessDevice::new();
    let stats = device.stats();

    let config = EngineConfig {
        worker_threads: WORKERS,
        ..EngineConfig::default()
    };
    let (mut engine, mut executor) = Engine::new(config, Box::new(device));

    // Shared resources, requested before any worker runs. Creation
    // returns immediately; construction happens in the frame loop.
    log::info!("requesting shared resources...");
    let program = engine.resources().create_program(
        "instanced.basic",
        ProgramDescriptor::new("// vertex stage", "// fragment stage"),
    );
    let texture = engine.resources().create_texture(
        "brick.tex",
        TextureDescriptor {
            width: 4,
            height: 4,
            format: TextureFormat::Rgba8Srgb,
            pixels: vec![128; 64],
        },
    );
    let mesh = engine.resources().create_mesh(
        "unit_cube",
        MeshDescriptor {
            vertex_data: vec![0; 24 * 12],
            vertex_stride: 12,
            indices: (0..36).collect(),
        },
    );
    let material = Material::new(MaterialId(0), program).with_texture(texture);

    // Workers build the swarm; finished entities flow back over a queue.
    log::info!("spawning {} entities on {WORKERS} workers...", WORKERS * ENTITIES_PER_WORKER);
    let spawned: MtQueue<Entity> = MtQueue::new();
    for worker in 0..WORKERS {
        let entities = Arc::clone(engine.entities());
        let transforms = Arc::clone(engine.transforms());
        let spawned = spawned.clone();
        engine.scheduler().submit(move || {
            for i in 0..ENTITIES_PER_WORKER {
                let entity = entities.create();
                transforms.add_component(
                    entity,
                    Vec3::new(worker as f32 * 10.0, i as f32, 0.0),
                    Quat::identity(),
                    Vec3::new(1.0, 1.0, 1.0),
                );
                spawned.push(entity);
            }
        });
    }
    engine.scheduler().wait_while_busy();

    while let Some(entity) = spawned.try_pop() {
        engine.jobs_mut().add_render_job(entity, &material, mesh);
    }
    log::info!("registered {} render jobs", engine.jobs().job_count());

    // Render loop: the owning thread drains device tasks once per
    // frame, then submits whatever is ready.
    for frame in 0..FRAMES {
        let constructed = executor.drain();
        let calls = engine
            .jobs()
            .build_draw_list(engine.resources(), engine.transforms());
        let instances: usize = calls.iter().map(DrawCall::instance_count).sum();
        executor.submit(&calls)?;
        log::info!(
            "frame {frame}: {constructed} constructions, {} draw calls, {instances} instances",
            calls.len()
        );
    }

    log::info!(
        "device totals: {} constructions, {} draw calls submitted",
        stats.creations(),
        stats.draw_calls().len()
    );
    engine.shutdown();
    Ok(())
}
