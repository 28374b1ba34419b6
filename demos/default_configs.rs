use surface_datagen::{default_configs, generate_data, ModelKind};

fn main() {
    println!("Surface-datagen Default Configuration Examples\n");

    // 1. Rough Bergomi production run
    println!("1. rBergomi Configuration (production):");
    let rbergomi = default_configs::rbergomi();
    println!("   Monte Carlo paths: {}", rbergomi.monte_carlo.samples);
    println!("   Steps per year: {}", rbergomi.monte_carlo.steps_per_year);
    println!("   Rows per partition: {}", rbergomi.partition.size);
    println!("   Output: {}\n", rbergomi.output_path().display());

    // 2. Heston production run
    println!("2. Heston Configuration (production):");
    let heston = default_configs::heston();
    println!("   Integration tolerance: {:.1e}", heston.heston_engine.tolerance);
    println!(
        "   Max integrand evaluations: {}",
        heston.heston_engine.max_evaluations
    );
    println!("   Resampling attempts: {}", heston.max_attempts);
    println!("   Output: {}\n", heston.output_path().display());

    // 3. Smoke configuration
    println!("3. Smoke Configuration (quick checks):");
    let smoke = default_configs::smoke();
    println!("   Seed: {:?}", smoke.seed);
    println!("   Monte Carlo paths: {}", smoke.monte_carlo.samples);
    println!("   Rows per partition: {}\n", smoke.partition.size);

    // Small seeded run on random contracts
    for model in [ModelKind::Rbergomi, ModelKind::Heston] {
        let mut config = smoke.clone();
        config.model = model;
        println!("Labeling 5 random contracts with {}...", model);
        match generate_data(5, &config) {
            Ok(dataset) => {
                println!("   Features: {:?}", dataset.feature_names);
                for (row, iv) in dataset.features.iter().zip(&dataset.labels) {
                    println!("   {:.4?} -> iv {:.4}", row, iv);
                }
                println!();
            }
            Err(e) => println!("   Generation failed: {:#}\n", e),
        }
    }
}
