use std::error::Error;

use ember_params::{Dim, LookupParameter, Parameter, ParameterCollection};
use ember_store::Config;
use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

/// Sizes of the sentiment model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentConfig {
    pub vocab_size: usize,
    pub input_dim: usize,
    pub hidden_dim: usize,
    pub sentiment_tags: usize,
}

impl Config for SentimentConfig {}

impl SentimentConfig {
    pub fn new(vocab_size: usize) -> Self {
        Self {
            vocab_size,
            input_dim: 300,
            hidden_dim: 168,
            sentiment_tags: 5,
        }
    }
}

/// Parameters of a sentiment classifier reading averaged word embeddings.
#[derive(Debug, Clone)]
pub struct SentimentModel {
    pub embeddings: LookupParameter,
    pub token_to_hidden: Parameter,
    pub input_bias: Parameter,
    pub root_to_sentiment: Parameter,
    pub sentiment_bias: Parameter,
}

impl SentimentModel {
    /// Register the parameters of the model in `pc`.
    pub fn new(pc: &mut ParameterCollection, config: &SentimentConfig) -> Self {
        Self {
            embeddings: pc.add_lookup_parameters(
                config.vocab_size,
                [config.input_dim],
                "embeddings",
            ),
            token_to_hidden: pc.add_parameters(
                [config.hidden_dim, config.input_dim],
                "token_to_hidden",
            ),
            input_bias: pc.add_parameters([config.hidden_dim], "input_bias"),
            root_to_sentiment: pc.add_parameters(
                [config.sentiment_tags, config.hidden_dim],
                "root_to_sentiment",
            ),
            sentiment_bias: pc.add_parameters([config.sentiment_tags], "sentiment_bias"),
        }
    }

    /// Find the parameters of the model in a populated collection, checking their sizes.
    pub fn from_collection(
        pc: &ParameterCollection,
        config: &SentimentConfig,
    ) -> Result<Self, Box<dyn Error>> {
        let ns = pc.namespace();
        let param = |name: &str, expected: Dim| -> Result<Parameter, Box<dyn Error>> {
            let param = pc
                .parameter(&format!("{ns}{name}"))
                .ok_or_else(|| format!("Missing parameter {ns}{name}"))?;
            check_dim(&param.name(), &expected, &param.dim())?;
            Ok(param)
        };

        let embeddings = pc
            .lookup_parameter(&format!("{ns}embeddings"))
            .ok_or_else(|| format!("Missing lookup parameter {ns}embeddings"))?;
        check_dim(
            &embeddings.name(),
            &Dim::new([config.input_dim, config.vocab_size]),
            &embeddings.all_dim(),
        )?;

        Ok(Self {
            embeddings,
            token_to_hidden: param(
                "token_to_hidden",
                Dim::new([config.hidden_dim, config.input_dim]),
            )?,
            input_bias: param("input_bias", Dim::new([config.hidden_dim]))?,
            root_to_sentiment: param(
                "root_to_sentiment",
                Dim::new([config.sentiment_tags, config.hidden_dim]),
            )?,
            sentiment_bias: param("sentiment_bias", Dim::new([config.sentiment_tags]))?,
        })
    }

    /// Fill every parameter with small deterministic values derived from `seed`.
    pub fn initialize(&self, seed: u64) -> Result<(), Box<dyn Error>> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut next = |len: usize| -> Vec<f32> {
            (0..len).map(|_| rng.random_range(-0.1..0.1)).collect()
        };

        self.embeddings
            .set_all_values(&next(self.embeddings.all_dim().num_elements()))?;
        for param in self.dense_parameters() {
            param.set_values(&next(param.dim().num_elements()))?;
        }

        Ok(())
    }

    /// Sentiment tag scores of a sentence given as word ids.
    pub fn scores(&self, ids: &[usize]) -> Result<Vec<f32>, Box<dyn Error>> {
        let input_dim = self.embeddings.dim().num_elements();
        let mut input = vec![0.0; input_dim];
        for id in ids {
            for (acc, value) in input.iter_mut().zip(self.embeddings.row(*id)?) {
                *acc += value / ids.len() as f32;
            }
        }

        let hidden: Vec<f32> = affine(&self.token_to_hidden, &self.input_bias, &input)
            .into_iter()
            .map(f32::tanh)
            .collect();

        Ok(affine(&self.root_to_sentiment, &self.sentiment_bias, &hidden))
    }

    fn dense_parameters(&self) -> [&Parameter; 4] {
        [
            &self.token_to_hidden,
            &self.input_bias,
            &self.root_to_sentiment,
            &self.sentiment_bias,
        ]
    }
}

fn check_dim(name: &str, expected: &Dim, found: &Dim) -> Result<(), Box<dyn Error>> {
    if expected != found {
        return Err(format!("Parameter {name} has dimension {found}, expected {expected}").into());
    }

    Ok(())
}

// weights * input + bias, with row-major weights.
fn affine(weights: &Parameter, bias: &Parameter, input: &[f32]) -> Vec<f32> {
    let weights = weights.values();
    let bias = bias.values();

    bias.iter()
        .enumerate()
        .map(|(row, b)| {
            let row = &weights[row * input.len()..(row + 1) * input.len()];
            b + row.iter().zip(input).map(|(w, x)| w * x).sum::<f32>()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_find_parameters_of_populated_collection() {
        let config = SentimentConfig::new(4);
        let mut pc = ParameterCollection::new().add_subcollection("sentiment");
        let model = SentimentModel::new(&mut pc, &config);
        model.initialize(42).unwrap();

        let found = SentimentModel::from_collection(&pc, &config).unwrap();

        assert!(found.embeddings.ptr_eq(&model.embeddings));
        assert_eq!(found.scores(&[1, 2]).unwrap(), model.scores(&[1, 2]).unwrap());
        assert_eq!(found.scores(&[3]).unwrap().len(), 5);
    }

    #[test]
    fn should_reject_collection_not_matching_config() {
        let mut pc = ParameterCollection::new().add_subcollection("sentiment");
        SentimentModel::new(&mut pc, &SentimentConfig::new(4));

        let result = SentimentModel::from_collection(&pc, &SentimentConfig::new(6));

        assert!(result.is_err());
    }

    #[test]
    fn should_initialize_deterministically_from_seed() {
        let config = SentimentConfig::new(3);
        let mut pc = ParameterCollection::new();
        let first = SentimentModel::new(&mut pc.add_subcollection("a"), &config);
        let second = SentimentModel::new(&mut pc.add_subcollection("b"), &config);

        first.initialize(7).unwrap();
        second.initialize(7).unwrap();

        let values = first.token_to_hidden.values();
        assert_eq!(values, second.token_to_hidden.values());
        assert!(values.iter().all(|v| (-0.1..0.1).contains(v)));
        assert!(values.iter().any(|v| *v != 0.0));
    }
}
