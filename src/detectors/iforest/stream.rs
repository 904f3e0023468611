//! Streaming scorer over bounded channels

use crossbeam_channel::{select, Receiver, Sender};

use crate::detectors::Score;
use crate::error::{GuardError, Result};

use super::IsolationForest;

impl IsolationForest {
    /// Scores samples from `input` until it closes, pushing one [`Score`]
    /// per sample to `output` in input order.
    ///
    /// Cancellation is cooperative and observed at every receive and every
    /// send, including while blocked on a full `output`; it is signalled by
    /// sending on (or dropping the sender of) the `cancel` channel. The
    /// coordinator never closes `output` — the caller owns both channels,
    /// symmetric with the caller closing `input`. A consumer that drops its
    /// receiver ends the stream cleanly.
    ///
    /// Per-sample scoring re-enters under the read lock, so a concurrent
    /// `fit` or `load` takes effect mid-stream at a sample boundary.
    pub fn predict_stream(
        &self,
        cancel: &Receiver<()>,
        input: &Receiver<Vec<f64>>,
        output: &Sender<Score>,
    ) -> Result<()> {
        if !self.is_trained() {
            return Err(GuardError::NotTrained);
        }

        loop {
            let sample = select! {
                recv(cancel) -> _ => return Err(GuardError::Cancelled),
                recv(input) -> msg => match msg {
                    Ok(sample) => sample,
                    // Input closed: clean end of stream.
                    Err(_) => return Ok(()),
                },
            };

            // Only reachable if the model was untrained, which was ruled out
            // above; skip the sample and keep the stream alive.
            let value = match self.predict_one(&sample) {
                Ok(value) => value,
                Err(_) => continue,
            };

            let score = Score {
                value,
                is_anomaly: value >= self.threshold(),
                features: sample,
                metadata: None,
            };

            select! {
                recv(cancel) -> _ => return Err(GuardError::Cancelled),
                send(output, score) -> sent => {
                    if sent.is_err() {
                        return Ok(());
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;
    use ndarray::Array2;
    use std::thread;

    use crate::detectors::iforest::ForestConfig;

    fn trained_forest() -> IsolationForest {
        let data = Array2::from_shape_fn((100, 3), |(i, j)| ((i * 5 + j * 11) % 17) as f64);
        let forest = IsolationForest::new(ForestConfig {
            n_trees: 10,
            ..Default::default()
        });
        forest.fit(&data).unwrap();
        forest
    }

    #[test]
    fn test_stream_requires_training() {
        let forest = IsolationForest::default();
        let (_cancel_tx, cancel_rx) = bounded::<()>(1);
        let (_input_tx, input_rx) = bounded::<Vec<f64>>(1);
        let (output_tx, _output_rx) = bounded::<Score>(1);

        let result = forest.predict_stream(&cancel_rx, &input_rx, &output_tx);
        assert!(matches!(result, Err(GuardError::NotTrained)));
    }

    #[test]
    fn test_closed_input_ends_stream() {
        let forest = trained_forest();
        let (_cancel_tx, cancel_rx) = bounded::<()>(1);
        let (input_tx, input_rx) = bounded::<Vec<f64>>(4);
        let (output_tx, output_rx) = bounded::<Score>(4);

        input_tx.send(vec![1.0, 2.0, 3.0]).unwrap();
        drop(input_tx);

        let result = thread::scope(|s| {
            let handle = s.spawn(|| forest.predict_stream(&cancel_rx, &input_rx, &output_tx));
            handle.join().unwrap()
        });
        assert!(result.is_ok());
        assert_eq!(output_rx.try_iter().count(), 1);
    }

    #[test]
    fn test_closed_output_ends_stream() {
        let forest = trained_forest();
        let (_cancel_tx, cancel_rx) = bounded::<()>(1);
        let (input_tx, input_rx) = bounded::<Vec<f64>>(4);
        let (output_tx, output_rx) = bounded::<Score>(1);
        drop(output_rx);

        input_tx.send(vec![1.0, 2.0, 3.0]).unwrap();

        let result = thread::scope(|s| {
            let handle = s.spawn(|| forest.predict_stream(&cancel_rx, &input_rx, &output_tx));
            handle.join().unwrap()
        });
        assert!(result.is_ok());
    }
}
