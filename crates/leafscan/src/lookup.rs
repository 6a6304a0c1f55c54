use crate::catalog::{CatalogEntry, LabelCatalog};
use crate::error::{LeafError, Result};

/// Index and value of the largest probability.
///
/// Ties go to the lowest index. An empty vector or a NaN entry is an
/// inference failure.
pub fn argmax(probabilities: &[f32]) -> Result<(usize, f32)> {
    let (first, rest) = probabilities
        .split_first()
        .ok_or_else(|| LeafError::Inference("model returned no probabilities".to_string()))?;

    let mut best = (0, *first);
    for (offset, &p) in rest.iter().enumerate() {
        if p > best.1 {
            best = (offset + 1, p);
        }
    }

    if probabilities.iter().any(|p| p.is_nan()) {
        return Err(LeafError::Inference("model returned NaN probabilities".to_string()));
    }

    Ok(best)
}

/// Winning class, its catalog entry and its probability
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction<'a> {
    pub class_index: usize,
    pub confidence: f32,
    pub entry: &'a CatalogEntry,
}

/// Pick the winning class and resolve its label and care text.
pub fn resolve<'a>(probabilities: &[f32], catalog: &'a LabelCatalog) -> Result<Prediction<'a>> {
    let (class_index, confidence) = argmax(probabilities)?;
    let entry = catalog.get(class_index)?;
    Ok(Prediction {
        class_index,
        confidence,
        entry,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_argmax() {
        assert_eq!(argmax(&[0.1, 0.7, 0.2]).unwrap(), (1, 0.7));
        assert_eq!(argmax(&[0.9]).unwrap(), (0, 0.9));
    }

    #[test]
    fn test_ties_pick_lowest_index() {
        assert_eq!(argmax(&[0.2, 0.4, 0.4]).unwrap().0, 1);
        assert_eq!(argmax(&[0.25, 0.25, 0.25, 0.25]).unwrap().0, 0);
        assert_eq!(argmax(&[0.0, 0.5, 0.0, 0.5]).unwrap().0, 1);
    }

    #[test]
    fn test_argmax_rejects_degenerate_vectors() {
        assert!(matches!(argmax(&[]), Err(LeafError::Inference(_))));
        assert!(matches!(argmax(&[0.5, f32::NAN]), Err(LeafError::Inference(_))));
    }

    #[test]
    fn test_resolve_apple_healthy() {
        let catalog = LabelCatalog::plant_village();
        let mut probabilities = vec![0.001; 38];
        probabilities[3] = 0.9;

        let prediction = resolve(&probabilities, &catalog).unwrap();
        assert_eq!(prediction.class_index, 3);
        assert_eq!(prediction.entry.label.as_str(), "Apple Healthy");
        assert_eq!(
            prediction.entry.care.as_str(),
            "No action needed. Maintain regular watering and fertilization."
        );
    }

    #[test]
    fn test_resolve_out_of_range() {
        let catalog = LabelCatalog::new(vec!["A".into(), "B".into()], HashMap::new()).unwrap();
        assert!(matches!(
            resolve(&[0.1, 0.2, 0.7], &catalog),
            Err(LeafError::Configuration(_))
        ));
    }
}
