//! Basic example: list devices, then scale a vector on the first one.
//!
//! Run with: cargo run --example basic

use clbind::{
    CommandQueue, CommandQueueProperties, Context, DeviceType, Error, Kernel, MemFlags, MemObject,
    Program, Runtime,
};

const SCALE: &str = r#"
__kernel void scale(__global float *v, float k) {
    size_t i = get_global_id(0);
    v[i] *= k;
}
"#;

fn main() -> clbind::Result<()> {
    env_logger::init();

    let runtime = Runtime::load()?;
    let platforms = runtime.platforms()?;
    if platforms.is_empty() {
        println!("No platforms found");
        return Ok(());
    }

    for platform in &platforms {
        println!("Platform: {} ({})", platform.name()?, platform.version()?);
        for device in platform.devices(DeviceType::ALL)? {
            println!("  Device: {}", device.name()?);
            println!("    Compute units: {}", device.max_compute_units()?);
            println!("    Global memory: {} MB", device.global_mem_size()? >> 20);
            println!("    Max work-group size: {}", device.max_work_group_size()?);
        }
    }

    let Some(device) = platforms[0].devices(DeviceType::ALL)?.into_iter().next() else {
        println!("\nNo device available - skipping kernel run");
        return Ok(());
    };

    println!("\n--- Running on {} ---", device.name()?);
    let context = Context::new(&[&device])?;
    let queue = CommandQueue::new(&context, &device, CommandQueueProperties::PROFILING_ENABLE)?;

    let program = Program::with_source(&context, &[SCALE])?;
    if let Err(err) = program.build(None, "") {
        if let Error::Build { log, .. } = &err {
            eprintln!("{}", log);
        }
        return Err(err);
    }
    let kernel = Kernel::new(&program, "scale")?;

    let values: Vec<f32> = (0..16).map(|i| i as f32).collect();
    let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_ne_bytes()).collect();
    let buffer = MemObject::buffer_from_host(&context, MemFlags::READ_WRITE, &bytes)?;

    kernel.set_arg_mem(0, &buffer)?;
    kernel.set_arg_scalar(1, &2.0f32)?;
    let done = queue.enqueue_kernel(&kernel, &[values.len()], None, None, None)?;

    let mut out = vec![0u8; bytes.len()];
    queue.read_buffer(&buffer, 0, &mut out, Some(&[&done]))?;
    let scaled: Vec<f32> = out
        .chunks_exact(4)
        .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    println!("Result: {:?}", scaled);
    println!("Kernel time: {} ns", done.duration()?);

    Ok(())
}
