use crate::error::GymRunError;
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Shape of the convolutional part of image-based discrete-action trainers.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CnnParameters {
    /// Number of channels of each convolution, input channels first.
    pub conv_dims: Vec<usize>,

    /// Kernel heights of the convolutions.
    pub conv_height_kernels: Vec<usize>,

    /// Kernel widths of the convolutions.
    pub conv_width_kernels: Vec<usize>,

    /// Kernel size and stride of the pooling after each convolution.
    pub pool_kernels_strides: Vec<usize>,

    /// Pooling after each convolution, `max` or `avg`.
    pub pool_types: Vec<String>,
}

impl Default for CnnParameters {
    fn default() -> Self {
        Self {
            conv_dims: vec![1, 32, 32],
            conv_height_kernels: vec![8, 4],
            conv_width_kernels: vec![8, 4],
            pool_kernels_strides: vec![2, 2],
            pool_types: vec!["max".to_string(), "max".to_string()],
        }
    }
}

impl CnnParameters {
    /// Number of convolution layers.
    pub fn num_conv_layers(&self) -> usize {
        self.conv_height_kernels.len()
    }

    /// Checks the lengths of the lists agree with each other.
    pub fn validate(&self) -> Result<()> {
        let n = self.num_conv_layers();
        let consistent = self.conv_dims.len() == n + 1
            && self.conv_width_kernels.len() == n
            && self.pool_kernels_strides.len() == n
            && self.pool_types.len() == n;
        if !consistent {
            return Err(GymRunError::InvalidConfig(format!(
                "inconsistent cnn parameters: {} conv dims for {} convolutions",
                self.conv_dims.len(),
                n
            ))
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        assert!(CnnParameters::default().validate().is_ok());

        let mut p = CnnParameters::default();
        p.conv_dims = vec![1, 32];
        assert!(p.validate().is_err());
    }
}
