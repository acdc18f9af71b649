/*!
# Saving Samples to CSV

Enable via the `csv` feature.
*/

use std::error::Error;
use std::fs::File;
use std::path::Path;

use csv::Writer;

/**
Saves a vector of samples as a CSV file.

The file has a header row `sample,value` followed by one row per sample, with
the sample's position in the vector and its value.

# Arguments

* `samples` - The values returned by the sampler.
* `filename` - The file path where the CSV data will be written.

# Returns

Returns `Ok(())` if successful, or an error if any I/O or CSV formatting
issue occurs.

# Examples

```rust
use ars_sampler::io::csv::save_csv;

let samples = vec![0.25, -1.5, 3.0];
save_csv(&samples, "/tmp/ars_output.csv")?;
# Ok::<(), Box<dyn std::error::Error>>(())
```
*/
pub fn save_csv<P: AsRef<Path>>(samples: &[f64], filename: P) -> Result<(), Box<dyn Error>> {
    let mut wtr = Writer::from_writer(File::create(filename)?);
    wtr.write_record(["sample", "value"])?;
    for (i, x) in samples.iter().enumerate() {
        wtr.write_record([i.to_string(), x.to_string()])?;
    }
    wtr.flush()?;
    Ok(())
}
