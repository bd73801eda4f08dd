// src/common/i18n.rs

use std::collections::HashMap;

/// Language used when the client asks for one we do not have.
pub const DEFAULT_LANG: &str = "fr";

const FR: &[(&str, &str)] = &[
    ("validation_failed", "Un ou plusieurs champs sont invalides."),
    ("required", "Ce champ est obligatoire."),
    ("invalid_email", "L'adresse e-mail est invalide."),
    ("password_too_short", "Le mot de passe doit contenir au moins 6 caractères."),
    ("invalid_phone", "Le numéro de téléphone est invalide."),
    ("invalid_capacity", "La capacité doit être d'au moins 1."),
    ("not_negative", "La valeur ne peut pas être négative."),
    ("positive", "La valeur doit être supérieure à zéro."),
    ("invalid_credentials", "E-mail ou mot de passe invalide."),
    ("invalid_token", "Jeton d'authentification invalide ou absent."),
    ("user_not_found", "Utilisateur introuvable."),
    ("email_exists", "Cet e-mail est déjà utilisé."),
    ("forbidden", "Vous n'avez pas les droits nécessaires pour cette action."),
    ("ferme_required", "Aucune ferme sélectionnée (en-tête X-Ferme-Id)."),
    ("ferme_access_denied", "Vous n'avez pas accès à cette ferme."),
    ("not_found", "Élément introuvable."),
    ("cin_exists", "Un ouvrier avec ce CIN existe déjà dans cette ferme."),
    ("room_exists", "Une chambre avec ce numéro existe déjà dans cette ferme."),
    ("insufficient_stock", "Stock insuffisant pour cette sortie."),
    ("transfer_processed", "Ce transfert a déjà été traité."),
    ("invalid_transfer", "Transfert invalide."),
    ("store_unavailable", "La base de données est momentanément indisponible. Réessayez dans quelques instants."),
    ("reconciliation_failed", "La synchronisation des chambres a échoué."),
    ("internal", "Une erreur inattendue s'est produite."),
];

const EN: &[(&str, &str)] = &[
    ("validation_failed", "One or more fields are invalid."),
    ("required", "This field is required."),
    ("invalid_email", "The e-mail address is invalid."),
    ("password_too_short", "The password must be at least 6 characters long."),
    ("invalid_phone", "The phone number is invalid."),
    ("invalid_capacity", "Capacity must be at least 1."),
    ("not_negative", "The value cannot be negative."),
    ("positive", "The value must be greater than zero."),
    ("invalid_credentials", "Invalid e-mail or password."),
    ("invalid_token", "Missing or invalid authentication token."),
    ("user_not_found", "User not found."),
    ("email_exists", "This e-mail is already in use."),
    ("forbidden", "You do not have the rights required for this action."),
    ("ferme_required", "No farm selected (X-Ferme-Id header)."),
    ("ferme_access_denied", "You do not have access to this farm."),
    ("not_found", "Item not found."),
    ("cin_exists", "A worker with this national id already exists on this farm."),
    ("room_exists", "A room with this number already exists on this farm."),
    ("insufficient_stock", "Not enough stock for this withdrawal."),
    ("transfer_processed", "This transfer has already been processed."),
    ("invalid_transfer", "Invalid transfer."),
    ("store_unavailable", "The database is temporarily unavailable. Please retry in a moment."),
    ("reconciliation_failed", "Room synchronization failed."),
    ("internal", "An unexpected error occurred."),
];

/// Translated API messages, keyed by language then message key.
#[derive(Debug, Clone)]
pub struct I18nStore {
    messages: HashMap<&'static str, HashMap<&'static str, &'static str>>,
}

impl Default for I18nStore {
    fn default() -> Self {
        Self::new()
    }
}

impl I18nStore {
    pub fn new() -> Self {
        let mut messages = HashMap::new();
        messages.insert("fr", FR.iter().copied().collect());
        messages.insert("en", EN.iter().copied().collect());
        Self { messages }
    }

    /// Message for `key` in `lang`, falling back to French, then to the key itself.
    pub fn translate(&self, lang: &str, key: &str) -> String {
        self.messages
            .get(lang)
            .and_then(|table| table.get(key))
            .or_else(|| self.messages.get(DEFAULT_LANG).and_then(|table| table.get(key)))
            .map(|msg| msg.to_string())
            .unwrap_or_else(|| key.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_french_then_key() {
        let store = I18nStore::new();
        assert_eq!(store.translate("en", "not_found"), "Item not found.");
        assert_eq!(store.translate("de", "not_found"), "Élément introuvable.");
        assert_eq!(store.translate("en", "unknown_key"), "unknown_key");
    }
}
