use std::fs;
use std::path::PathBuf;

use sim_data::SimulationInfo;
use trainer::{train, MemoryLogger, Model, TrainConfig, TrainerErr};

fn info() -> SimulationInfo {
    SimulationInfo {
        sim_input_names: vec!["alpha".into(), "beta".into()],
        sim_output_names: vec!["response".into()],
        sim_input_mins: vec![0.0, 0.0],
        sim_input_maxs: vec![10.0, 1.0],
        sim_output_mins: vec![0.0],
        sim_output_maxs: vec![100.0],
    }
}

fn temp(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("trainer_reg_{}_{name}", std::process::id()))
}

fn write_dataset(path: &PathBuf) {
    let mut text = String::from("alpha,beta,response\n");
    for i in 0..10 {
        let alpha = i as f32;
        let beta = i as f32 / 10.0;
        let response = 10.0 * alpha + 5.0 * beta;
        text.push_str(&format!("{alpha},{beta},{response}\n"));
    }
    fs::write(path, text).unwrap();
}

#[test]
fn ten_row_regression_end_to_end() {
    let _ = env_logger::builder().is_test(true).try_init();

    let data_path = temp("data.csv");
    let model_path = temp("model.safetensors");
    let mse_path = temp("mse.csv");
    write_dataset(&data_path);

    let cfg = TrainConfig {
        use_gan: false,
        load_data_path: Some(data_path.clone()),
        save_model_path: Some(model_path.clone()),
        save_data_path: Some(mse_path.clone()),
        num_epochs: 1,
        batch_size: 4,
        learning_rate: 0.05,
        status_every_epoch: 1,
        status_every_sample: 1,
        seed: Some(7),
        ..TrainConfig::default()
    };

    let logger = MemoryLogger::new();
    train(&cfg, &info(), &logger).unwrap();

    // The saved model reloads as a regression model with the schema's shape.
    let model = Model::load(&model_path).unwrap();
    assert!(!model.is_adversarial());
    assert_eq!(model.num_inputs(), 1);
    assert_eq!(model.num_labels(), 2);

    // 2 testing rows and 8 training rows split into batches of 4: the first
    // training batches of the epoch start at samples 1 and 5.
    let lines = logger.lines();
    assert!(lines.iter().any(|l| l.contains("Beginning sample 1/10")));
    assert!(lines.iter().any(|l| l.contains("Beginning sample 5/10")));
    assert!(lines.iter().any(|l| l.contains("(testing phase)")));
    assert!(lines.iter().any(|l| l.contains("Last testing MSE")));
    assert!(lines.iter().any(|l| l.contains("Done training all epochs.")));

    // One epoch exports one testing row and one training row.
    let text = fs::read_to_string(&mse_path).unwrap();
    let rows: Vec<&str> = text.lines().collect();
    assert_eq!(rows[0], "is_training,mse_alpha,mse_beta");
    assert_eq!(rows.len(), 3);
    assert!(rows[1].starts_with("0,"));
    assert!(rows[2].starts_with("1,"));

    for path in [&data_path, &model_path, &mse_path] {
        fs::remove_file(path).ok();
    }
}

#[test]
fn repeated_epochs_keep_the_export_blocks_ordered() {
    let data_path = temp("blocks_data.csv");
    let model_path = temp("blocks_model.safetensors");
    let mse_path = temp("blocks_mse.csv");
    write_dataset(&data_path);

    let cfg = TrainConfig {
        use_gan: false,
        load_data_path: Some(data_path.clone()),
        save_model_path: Some(model_path.clone()),
        save_data_path: Some(mse_path.clone()),
        num_epochs: 3,
        batch_size: 0,
        status_every_epoch: 0,
        seed: Some(11),
        ..TrainConfig::default()
    };

    train(&cfg, &info(), &MemoryLogger::new()).unwrap();

    let text = fs::read_to_string(&mse_path).unwrap();
    let rows: Vec<&str> = text.lines().collect();
    assert_eq!(rows.len(), 1 + 6);
    for row in &rows[1..4] {
        assert!(row.starts_with("0,"), "testing block first: {row}");
    }
    for row in &rows[4..7] {
        assert!(row.starts_with("1,"), "training block second: {row}");
    }

    for path in [&data_path, &model_path, &mse_path] {
        fs::remove_file(path).ok();
    }
}

#[test]
fn missing_required_arguments_fail_before_training() {
    let data_path = temp("args_data.csv");
    write_dataset(&data_path);

    let logger = MemoryLogger::new();

    let no_data = TrainConfig {
        use_gan: false,
        save_model_path: Some(temp("args_model.safetensors")),
        ..TrainConfig::default()
    };
    assert!(matches!(
        train(&no_data, &info(), &logger),
        Err(TrainerErr::Config(_))
    ));

    let no_model = TrainConfig {
        use_gan: false,
        load_data_path: Some(data_path.clone()),
        ..TrainConfig::default()
    };
    assert!(matches!(
        train(&no_model, &info(), &logger),
        Err(TrainerErr::Config(_))
    ));

    let no_epochs = TrainConfig {
        use_gan: false,
        load_data_path: Some(data_path.clone()),
        save_model_path: Some(temp("args_model.safetensors")),
        num_epochs: 0,
        ..TrainConfig::default()
    };
    assert!(matches!(
        train(&no_epochs, &info(), &logger),
        Err(TrainerErr::Config(_))
    ));

    fs::remove_file(&data_path).ok();
}

#[test]
fn empty_dataset_is_rejected() {
    let data_path = temp("empty_data.csv");
    fs::write(&data_path, "alpha,beta,response\n").unwrap();

    let cfg = TrainConfig {
        use_gan: false,
        load_data_path: Some(data_path.clone()),
        save_model_path: Some(temp("empty_model.safetensors")),
        num_epochs: 1,
        ..TrainConfig::default()
    };
    assert!(matches!(
        train(&cfg, &info(), &MemoryLogger::new()),
        Err(TrainerErr::Config(_))
    ));

    fs::remove_file(&data_path).ok();
}
