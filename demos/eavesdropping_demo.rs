use bb84_sim::prelude::*;

fn simulate(particles: usize, eavesdropping: bool) -> Result<(), Box<dyn std::error::Error>> {
    println!(
        "BB84 with {} particles, eavesdropping {}",
        particles, eavesdropping
    );

    let config = SimConfig::new(particles, eavesdropping).with_amplified_key();
    let outcome = run_with(&config, &mut rand::thread_rng(), &mut LogObserver)?;

    println!(
        "Sifted {} bits, sampled {}, QBER {:.1}%",
        outcome.sifted_len,
        outcome.sample_size(),
        outcome.qber() * 100.0
    );
    match outcome.key {
        Some(key) => println!("Channel clean, {}-bit key established", key.len()),
        None => println!("Interference detected, key discarded"),
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    simulate(16, false)?;
    println!();
    simulate(16, true)?;
    Ok(())
}
