use clap::Parser;
use linux_embedded_hal::{
    CdevPin, SpidevBus,
    gpio_cdev::{Chip, LineRequestFlags},
    spidev::{SpiModeFlags, SpidevOptions},
};
use max31865::{Calibration, Max31865, NoiseFilter, SpiTransport, Wires};

/// Read MAX31865 RTD converters sharing one SPI bus
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to SPI device (e.g., /dev/spidev0.0)
    #[arg(short, long, default_value = "/dev/spidev0.0")]
    path: String,
    /// GPIO character device driving the chip-select lines
    #[arg(short, long, default_value = "/dev/gpiochip0")]
    gpiochip: String,
    /// GPIO line of a chip-select, one per converter
    #[arg(long = "cs", required = true)]
    cs: Vec<u32>,
    /// RTD lead configuration
    #[arg(short, long, default_value_t = 4, value_parser = clap::value_parser!(u8).range(2..=4))]
    wires: u8,
    /// RTD resistance at 0 °C in ohms
    #[arg(long, default_value_t = 100.0)]
    nominal: f32,
    /// Reference resistor in ohms
    #[arg(long, default_value_t = 430.0)]
    reference: f32,
    /// Reject 50 Hz instead of 60 Hz
    #[arg(long)]
    filter_50hz: bool,
    /// SPI clock in Hz
    #[arg(short, long, default_value_t = 1_000_000)]
    speed: u32,
}

fn main() {
    // Initialize the logger
    env_logger::init();
    // Parse command line arguments
    let args = Args::parse();
    let wires = Wires::try_from(args.wires).expect("Invalid wire count");
    let calibration = Calibration::new(args.nominal, args.reference);
    let filter = if args.filter_50hz {
        NoiseFilter::Hz50
    } else {
        NoiseFilter::Hz60
    };
    // Open the SPI bus; chip-selects are driven as GPIOs
    let mut spi = SpidevBus::open(&args.path).expect("Failed to open SPI device");
    let options = SpidevOptions::new()
        .bits_per_word(8)
        .max_speed_hz(args.speed)
        .mode(SpiModeFlags::SPI_MODE_1 | SpiModeFlags::SPI_NO_CS)
        .build();
    spi.configure(&options).expect("Failed to configure SPI device");
    let mut bus = SpiTransport::new(spi);
    let mut delay = linux_embedded_hal::Delay;
    // Bind one converter per chip-select line
    let mut chip = Chip::new(&args.gpiochip).expect("Failed to open GPIO chip");
    let mut devices = args
        .cs
        .iter()
        .map(|&line| {
            let handle = chip
                .get_line(line)
                .expect("Failed to get chip-select line")
                .request(LineRequestFlags::OUTPUT, 1, "max31865")
                .expect("Failed to request chip-select line");
            let cs = CdevPin::new(handle).expect("Failed to create chip-select pin");
            (line, Max31865::new(cs, wires))
        })
        .collect::<Vec<_>>();
    for (_, device) in devices.iter_mut() {
        device
            .initialize(&mut bus)
            .expect("Failed to initialize MAX31865");
        device
            .set_filter(&mut bus, filter)
            .expect("Failed to set noise filter");
    }
    log::info!("Initialized {} devices", devices.len());
    // One measurement per converter
    for (line, device) in devices.iter_mut() {
        let measurement = match device.measure_temperature(&mut bus, &mut delay, &calibration) {
            Ok(m) => m,
            Err(e) => {
                log::warn!("CS {}: {}", line, e);
                continue;
            }
        };
        log::info!(
            "CS {}: Resistance: {:.3} ohm, Temperature: {:.2} °C",
            line,
            measurement.resistance,
            measurement.celsius
        );
        if measurement.has_fault() {
            match device.read_fault_status(&mut bus) {
                Ok(status) => {
                    for fault in status.faults() {
                        log::warn!("CS {}: Fault: {}", line, fault.description());
                    }
                }
                Err(e) => log::warn!("CS {}: Failed to read fault status: {}", line, e),
            }
        }
    }
}
